//! # Mission registry
//!
//! Maps every [`Mission`] to the handler that serves it: a file-based
//! [`MissionPipeline`] or a [`PlotServiceQuery`] against the legacy plot service.
//! Dispatch is a table lookup; a mission without a handler fails the whole batch with
//! [`DeliveryError::UnregisteredMission`].
use std::collections::HashMap;
use std::sync::Arc;

use crate::delivery_errors::DeliveryError;
use crate::mission::Mission;
use crate::missions::galex::GalexPipeline;
use crate::missions::hsc_grism::HscGrismPipeline;
use crate::missions::hsla::HslaPipeline;
use crate::missions::iue::IuePipeline;
use crate::missions::k2::K2Pipeline;
use crate::missions::k2_hlsp::{HlspPipeline, HlspProduct};
use crate::missions::kepler::KeplerPipeline;
use crate::missions::states::StatesPipeline;
use crate::missions::tess::TessPipeline;
use crate::missions::MissionPipeline;
use crate::plot_service::PlotServiceQuery;

#[derive(Debug, Clone)]
pub enum Handler {
    Archive(Arc<dyn MissionPipeline>),
    PlotService(PlotServiceQuery),
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    handlers: HashMap<Mission, Handler>,
}

impl Registry {
    /// A registry with no handler at all.
    pub fn empty() -> Self {
        Registry::default()
    }

    /// Every mission of [`Mission::ALL`] wired to its handler.
    pub fn standard() -> Self {
        let mut registry = Registry::empty();
        registry
            .register_archive(KeplerPipeline)
            .register_archive(K2Pipeline)
            .register_archive(TessPipeline)
            .register_archive(GalexPipeline)
            .register_archive(IuePipeline)
            .register_archive(HslaPipeline)
            .register_archive(HscGrismPipeline)
            .register_archive(StatesPipeline);
        for product in HlspProduct::ALL {
            registry.register_archive(HlspPipeline::new(product));
        }
        for query in PlotServiceQuery::standard() {
            registry.register_plot_service(query);
        }
        registry
    }

    /// Register a pipeline under its own mission, replacing any previous handler.
    pub fn register_archive<P: MissionPipeline + 'static>(&mut self, pipeline: P) -> &mut Self {
        self.handlers
            .insert(pipeline.mission(), Handler::Archive(Arc::new(pipeline)));
        self
    }

    pub fn register_plot_service(&mut self, query: PlotServiceQuery) -> &mut Self {
        self.handlers
            .insert(query.mission, Handler::PlotService(query));
        self
    }

    pub fn get(&self, mission: Mission) -> Result<&Handler, DeliveryError> {
        self.handlers
            .get(&mission)
            .ok_or(DeliveryError::UnregisteredMission(mission))
    }

    pub fn contains(&self, mission: Mission) -> bool {
        self.handlers.contains_key(&mission)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod registry_test {
    use super::*;

    #[test]
    fn test_standard_covers_every_mission() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), Mission::ALL.len());
        for mission in Mission::ALL {
            let handler = registry.get(mission).unwrap();
            let served = match handler {
                Handler::Archive(pipeline) => pipeline.mission(),
                Handler::PlotService(query) => query.mission,
            };
            assert_eq!(served, mission);
        }
    }

    #[test]
    fn test_plot_service_missions() {
        let registry = Registry::standard();
        assert!(matches!(registry.get(Mission::Euve), Ok(Handler::PlotService(_))));
        assert!(matches!(registry.get(Mission::Kepler), Ok(Handler::Archive(_))));
    }

    #[test]
    fn test_unregistered() {
        let mut registry = Registry::empty();
        assert!(matches!(
            registry.get(Mission::Tess),
            Err(DeliveryError::UnregisteredMission(Mission::Tess))
        ));
        registry.register_archive(TessPipeline);
        assert!(registry.contains(Mission::Tess));
        assert!(!registry.contains(Mission::K2));
    }
}
