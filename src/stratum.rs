use {
    crate::{CONNECT_TIMEOUT, KEEPALIVE_INTERVAL, MAX_MESSAGE_SIZE, REQUEST_TIMEOUT, USER_AGENT},
    bitcoin::{
        BlockHash,
        hashes::{Hash, sha256d},
    },
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    derive_more::Display,
    futures::stream::StreamExt,
    hex::FromHex,
    rand::RngCore,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::Value,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::{ResultExt, Snafu},
    std::{
        collections::HashMap,
        fmt::{self, Display, Formatter},
        str::FromStr,
        sync::Arc,
        time::Duration,
    },
    tokio::{
        io::{AsyncWriteExt, BufWriter},
        net::{TcpStream, tcp::OwnedWriteHalf},
        sync::{broadcast, mpsc, oneshot, watch},
        time::{Instant, MissedTickBehavior, interval},
    },
    tokio_util::{
        codec::{FramedRead, LinesCodec},
        sync::CancellationToken,
    },
    tracing::{debug, error, info, warn},
};

#[cfg(test)]
use serde_json::json;

mod authorize;
mod client;
mod difficulty;
mod error;
mod event;
mod extranonce;
mod job_id;
mod merkle;
mod message;
mod nbits;
mod nonce;
mod notify;
mod ntime;
mod prevhash;
mod set_difficulty;
mod submit;
mod subscribe;
mod version;

pub use {
    authorize::Authorize,
    client::{Client, ClientConfig, ClientError, EventReceiver, Session, SubmitOutcome},
    difficulty::Difficulty,
    error::{InternalError, JsonRpcError},
    event::Event,
    extranonce::Extranonce,
    job_id::JobId,
    merkle::{MerkleNode, merkle_root},
    message::{Id, Message},
    nbits::Nbits,
    nonce::Nonce,
    notify::Notify,
    ntime::Ntime,
    prevhash::PrevHash,
    set_difficulty::SetDifficulty,
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    version::Version,
};

type Result<T = (), E = InternalError> = std::result::Result<T, E>;
