use {
    super::*,
    crate::options::Options,
    std::{collections::BTreeMap, fs},
    sysinfo::System,
};

pub(crate) use miner_options::MinerOptions;

mod miner_options;

pub const DEFAULT_NONCE_RANGE: u64 = 1 << 20;
pub const DEFAULT_RANDOM_STARTS: usize = 4;
pub const DEFAULT_STATUS_INTERVAL: u64 = 10;

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pools: Vec<PoolConfig>,
    pub miner: Option<MinerSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerSection {
    pub cpu_cores: Option<usize>,
    pub nonce_range: Option<u64>,
    pub random_starts: Option<usize>,
    pub once: Option<bool>,
    pub status_interval: Option<u64>,
}

/// Resolved miner configuration. Command line beats environment beats config
/// file beats defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub pools: Vec<PoolConfig>,
    pub cpu_cores: Option<usize>,
    pub nonce_range: Option<u64>,
    pub random_starts: Option<usize>,
    pub once: bool,
    pub status_interval: Option<u64>,
}

impl Settings {
    pub(crate) fn load(options: Options, miner: MinerOptions) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix("PICKAXE_") else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, miner, env)
    }

    pub(crate) fn merge(
        options: Options,
        miner: MinerOptions,
        env: BTreeMap<String, String>,
    ) -> Result<Self> {
        let settings = Self::from_options(&options, &miner)?;

        let settings = settings.or(Self::from_env(&env)?);

        let config = if let Some(config_path) = &settings.config {
            toml::from_str(&fs::read_to_string(config_path).context(anyhow!(
                "failed to open config file `{}`",
                config_path.display()
            ))?)
            .context(anyhow!(
                "failed to deserialize config file `{}`",
                config_path.display()
            ))?
        } else {
            Config::default()
        };

        let settings = settings.or(Self::from_config(config));

        let settings = settings.or_defaults();

        Self::validate(&settings)?;

        Ok(settings)
    }

    pub(crate) fn from_options(options: &Options, miner: &MinerOptions) -> Result<Self> {
        let mut pools = Vec::new();

        if let Some(endpoint) = &miner.stratum_endpoint {
            let username = miner
                .username
                .as_deref()
                .with_context(|| format!("pool `{endpoint}` needs --username"))?;

            pools.push(PoolConfig::from_endpoint(
                endpoint,
                username,
                miner.password.as_deref().unwrap_or("x"),
                miner.priority.unwrap_or_default(),
            )?);
        } else {
            ensure!(
                miner.username.is_none() && miner.password.is_none() && miner.priority.is_none(),
                "--username, --password and --priority need a pool <HOST:PORT>"
            );
        }

        Ok(Self {
            config: options.config.clone(),
            pools,
            cpu_cores: miner.cpu_cores,
            nonce_range: miner.nonce_range,
            random_starts: miner.random_starts,
            once: miner.once,
            status_interval: miner.status_interval,
        })
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        let get_bool = |key: &str| {
            env.get(key)
                .map(|value| !value.is_empty() && value != "0" && value.to_lowercase() != "false")
                .unwrap_or_default()
        };

        let get_path = |key: &str| env.get(key).map(PathBuf::from);

        fn get<T: FromStr>(env: &BTreeMap<String, String>, key: &str) -> Result<Option<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            env.get(key)
                .map(|value| value.parse::<T>())
                .transpose()
                .with_context(|| {
                    format!(
                        "failed to parse environment variable PICKAXE_{key} as {}",
                        std::any::type_name::<T>()
                    )
                })
        }

        Ok(Self {
            config: get_path("CONFIG"),
            pools: Vec::new(),
            cpu_cores: get(env, "CPU_CORES")?,
            nonce_range: get(env, "NONCE_RANGE")?,
            random_starts: get(env, "RANDOM_STARTS")?,
            once: get_bool("ONCE"),
            status_interval: get(env, "STATUS_INTERVAL")?,
        })
    }

    pub fn from_config(config: Config) -> Self {
        let miner = config.miner.unwrap_or_default();

        Self {
            config: None,
            pools: config.pools,
            cpu_cores: miner.cpu_cores,
            nonce_range: miner.nonce_range,
            random_starts: miner.random_starts,
            once: miner.once.unwrap_or_default(),
            status_interval: miner.status_interval,
        }
    }

    /// Merge self with another Settings, self takes priority. Pools from
    /// both sides are kept, ours first.
    pub fn or(self, other: Self) -> Self {
        Self {
            config: self.config.or(other.config),
            pools: self.pools.into_iter().chain(other.pools).collect(),
            cpu_cores: self.cpu_cores.or(other.cpu_cores),
            nonce_range: self.nonce_range.or(other.nonce_range),
            random_starts: self.random_starts.or(other.random_starts),
            once: self.once || other.once,
            status_interval: self.status_interval.or(other.status_interval),
        }
    }

    fn or_defaults(self) -> Self {
        let available = available_cpu_cores();

        Self {
            cpu_cores: Some(
                self.cpu_cores
                    .map_or(available, |cores| cores.min(available)),
            ),
            nonce_range: Some(self.nonce_range.unwrap_or(DEFAULT_NONCE_RANGE)),
            random_starts: Some(self.random_starts.unwrap_or(DEFAULT_RANDOM_STARTS)),
            status_interval: Some(self.status_interval.unwrap_or(DEFAULT_STATUS_INTERVAL)),
            ..self
        }
    }

    fn validate(settings: &Self) -> Result {
        ensure!(
            !settings.pools.is_empty(),
            "no pools configured: pass a pool <HOST:PORT> or add [[pools]] to a config file"
        );

        let mut names = HashSet::new();
        for pool in &settings.pools {
            ensure!(
                names.insert(pool.name.as_str()),
                "duplicate pool name `{}`",
                pool.name
            );
            ensure!(!pool.username.is_empty(), "pool `{}` has no username", pool.name);
        }

        ensure!(settings.cpu_cores != Some(0), "cpu cores must be at least 1");
        ensure!(settings.nonce_range != Some(0), "nonce range must be at least 1");
        ensure!(
            settings.status_interval != Some(0),
            "status interval must be at least 1 second"
        );

        Ok(())
    }

    pub fn pools(&self) -> Vec<PoolConfig> {
        self.pools.clone()
    }

    pub fn cpu_cores(&self) -> usize {
        self.cpu_cores.unwrap_or(1)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval.unwrap_or(DEFAULT_STATUS_INTERVAL))
    }

    pub fn connector_settings(&self) -> ConnectorSettings {
        ConnectorSettings::default()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            workers: self.cpu_cores(),
            nonce_range: self.nonce_range.unwrap_or(DEFAULT_NONCE_RANGE),
            random_starts: self.random_starts.unwrap_or(DEFAULT_RANDOM_STARTS),
            once: self.once,
            ..Default::default()
        }
    }
}

fn available_cpu_cores() -> usize {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.cpus().len().max(1)
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq, std::io::Write};

    fn miner(args: &str) -> MinerOptions {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            miner: MinerOptions,
        }

        Wrapper::try_parse_from(args.split_whitespace())
            .unwrap()
            .miner
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn options(config: &tempfile::NamedTempFile) -> Options {
        Options {
            config: Some(config.path().into()),
        }
    }

    #[test]
    fn command_line_pool() {
        let settings = Settings::merge(
            Options::default(),
            miner("pickaxe stratum+tcp://pool.example.com --username worker --priority -2"),
            BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(
            settings.pools,
            vec![PoolConfig {
                name: "pool.example.com:3333".into(),
                host: "pool.example.com".into(),
                port: 3333,
                username: "worker".into(),
                password: "x".into(),
                priority: -2,
            }]
        );
    }

    #[test]
    fn no_pools_is_an_error() {
        let err = Settings::merge(Options::default(), miner("pickaxe"), BTreeMap::new())
            .unwrap_err()
            .to_string();

        assert!(err.starts_with("no pools configured"), "{err}");
    }

    #[test]
    fn endpoint_without_username_is_an_error() {
        assert!(
            Settings::merge(
                Options::default(),
                miner("pickaxe pool.example.com:3334"),
                BTreeMap::new()
            )
            .is_err()
        );
    }

    #[test]
    fn username_without_endpoint_is_an_error() {
        assert!(Settings::from_options(&Options::default(), &miner("pickaxe --username w")).is_err());
    }

    #[test]
    fn config_file_pools_and_miner_section() {
        let file = config_file(
            r#"
                [[pools]]
                name = "primary"
                host = "primary.example.com"
                username = "worker"
                priority = 10

                [[pools]]
                name = "backup"
                host = "backup.example.com"
                port = 4444
                username = "worker"
                password = "secret"

                [miner]
                nonce_range = 4096
                random_starts = 2
                status_interval = 30
            "#,
        );

        let settings = Settings::merge(options(&file), miner("pickaxe"), BTreeMap::new()).unwrap();

        assert_eq!(settings.pools.len(), 2);
        assert_eq!(settings.pools[0].address(), "primary.example.com:3333");
        assert_eq!(settings.pools[0].priority, 10);
        assert_eq!(settings.pools[1].address(), "backup.example.com:4444");
        assert_eq!(settings.pools[1].password, "secret");

        let engine = settings.engine_settings();
        assert_eq!(engine.nonce_range, 4096);
        assert_eq!(engine.random_starts, 2);
        assert_eq!(settings.status_interval(), Duration::from_secs(30));
    }

    #[test]
    fn command_line_overrides_config_file() {
        let file = config_file(
            r#"
                [[pools]]
                name = "primary"
                host = "primary.example.com"
                username = "worker"

                [miner]
                nonce_range = 4096
            "#,
        );

        let settings = Settings::merge(
            options(&file),
            miner("pickaxe 127.0.0.1:3334 --username local --nonce-range 16 --once"),
            BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(settings.pools.len(), 2);
        assert_eq!(settings.pools[0].name, "127.0.0.1:3334");
        assert_eq!(settings.pools[1].name, "primary");
        assert_eq!(settings.nonce_range, Some(16));
        assert!(settings.once);
    }

    #[test]
    fn environment_sits_between_command_line_and_config_file() {
        let file = config_file(
            r#"
                [[pools]]
                name = "primary"
                host = "primary.example.com"
                username = "worker"

                [miner]
                random_starts = 1
                nonce_range = 4096
            "#,
        );

        let mut env = BTreeMap::new();
        env.insert("RANDOM_STARTS".into(), "7".into());
        env.insert("NONCE_RANGE".into(), "99".into());

        let settings = Settings::merge(
            options(&file),
            miner("pickaxe --nonce-range 5"),
            env,
        )
        .unwrap();

        assert_eq!(settings.random_starts, Some(7));
        assert_eq!(settings.nonce_range, Some(5));
    }

    #[test]
    fn bad_environment_value() {
        let mut env = BTreeMap::new();
        env.insert("CPU_CORES".into(), "many".into());
        assert!(Settings::from_env(&env).is_err());
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(toml::from_str::<Config>("threads = 4").is_err());
        assert!(toml::from_str::<Config>("[miner]\nthrottle = \"1M\"").is_err());
    }

    #[test]
    fn duplicate_pool_names_are_rejected() {
        let file = config_file(
            r#"
                [[pools]]
                name = "same"
                host = "a.example.com"
                username = "worker"

                [[pools]]
                name = "same"
                host = "b.example.com"
                username = "worker"
            "#,
        );

        assert!(Settings::merge(options(&file), miner("pickaxe"), BTreeMap::new()).is_err());
    }

    #[test]
    fn cpu_cores_are_capped() {
        let settings = Settings::merge(
            Options::default(),
            miner("pickaxe 127.0.0.1 --username w --cpu-cores 100000"),
            BTreeMap::new(),
        )
        .unwrap();

        assert!(settings.cpu_cores() >= 1);
        assert!(settings.cpu_cores() <= available_cpu_cores());
        assert_eq!(settings.engine_settings().workers, settings.cpu_cores());
    }

    #[test]
    fn missing_config_file() {
        let options = Options {
            config: Some("/nonexistent/pickaxe.toml".into()),
        };

        let err = Settings::merge(options, miner("pickaxe"), BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("failed to open config file"));
    }
}
