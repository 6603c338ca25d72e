use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;
use tracing::debug;

/// Loads settings from `config/settings.yaml` with `APP__`-prefixed
/// environment variable overrides.
pub fn load_app_settings() -> Result<AppSettings> {
    // Need to load from dotenv first so env overrides apply.
    dotenv::from_path(".env").ok();
    let config_path = Path::new("config/settings.yaml").canonicalize()?;
    load_app_settings_from(&config_path)
}

pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings> {
    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    let settings: AppSettings = raw_settings.into();
    debug!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_defaults_for_omitted_sections() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "services:\n  detector_url: http://localhost:9000\n  vision_url: http://localhost:8080\n  face_store_file: faces.json"
        )
        .expect("write config");

        let settings = load_app_settings_from(file.path()).expect("settings");
        assert_eq!(settings.pipeline.page_size, 50);
        assert_eq!(settings.pipeline.title_attempts, 5);
        assert!((settings.matching.threshold - 1.0).abs() < f32::EPSILON);
        assert_eq!(settings.matching.age_window_years, 10);
        assert_eq!(settings.naming.template, "{date} - {title}");
        assert!(settings.services.face_store_file.is_absolute());
    }
}
