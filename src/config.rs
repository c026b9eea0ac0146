use anyhow::{Context, Result};
use std::{env, path::PathBuf, sync::OnceLock};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// UI server configuration
    pub ui: UiConfig,

    /// jaQC device endpoint configuration
    pub device: DeviceConfig,

    /// Path configuration
    pub paths: PathConfig,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub base_url: String,
    /// Submit saved connectivity settings to the device. The device side of
    /// this surface is not deployed everywhere yet, so it defaults to off.
    pub submit_on_save: bool,
}

#[derive(Clone, Debug)]
pub struct PathConfig {
    pub settings_file: PathBuf,
    pub static_dir: PathBuf,
    pub index_html: PathBuf,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// Returns a reference to the cached configuration. On first call, it loads
    /// and validates all configuration from environment variables. Subsequent
    /// calls return the cached instance.
    ///
    /// # Panics
    /// Panics if configuration loading fails. This is intentional as the
    /// application cannot function without valid configuration.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            Self::load_internal().expect("failed to load application configuration")
        })
    }

    fn load_internal() -> Result<Self> {
        let ui = UiConfig::load()?;
        let device = DeviceConfig::load()?;
        let paths = PathConfig::load()?;

        Ok(Self { ui, device, paths })
    }
}

impl UiConfig {
    fn load() -> Result<Self> {
        let port = env::var("UI_PORT")
            .unwrap_or_else(|_| "8013".to_string())
            .parse::<u16>()
            .context("failed to parse UI_PORT: invalid format")?;

        Ok(Self { port })
    }
}

impl DeviceConfig {
    fn load() -> Result<Self> {
        let base_url = env::var("DEVICE_URL").unwrap_or_else(|_| "http://192.168.4.1".to_string());
        let submit_on_save = env::var("DEVICE_SUBMIT")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            base_url,
            submit_on_save,
        })
    }
}

impl PathConfig {
    fn load() -> Result<Self> {
        let data_dir = Self::data_dir();

        std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

        let settings_file = data_dir.join("settings.ini");
        let static_dir =
            PathBuf::from(env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()));
        let index_html = static_dir.join("index.html");

        Ok(Self {
            settings_file,
            static_dir,
            index_html,
        })
    }

    #[cfg(not(any(test, feature = "mock")))]
    fn data_dir() -> PathBuf {
        PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "/data".to_string()))
    }

    // In test mode, use temp directory as default to avoid /data requirement
    #[cfg(any(test, feature = "mock"))]
    fn data_dir() -> PathBuf {
        std::env::temp_dir().join("jaqc-ui-test")
    }
}
