use crate::{MatchSettings, NamingSettings, PipelineSettings, RawSettings, ServiceSettings};
use std::path::absolute;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub matching: MatchSettings,
    pub pipeline: PipelineSettings,
    pub naming: NamingSettings,
    pub services: ServiceSettings,
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        let mut services = raw.services;
        services.face_store_file =
            absolute(&services.face_store_file).expect("Invalid face_store_file");

        Self {
            matching: raw.matching,
            pipeline: raw.pipeline,
            naming: raw.naming,
            services,
        }
    }
}
