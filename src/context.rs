//! Process-lifetime application state shared by all request handlers.

use crate::config::{Config, ModelPaths, RecognizeConfig, resolve_model_paths};
use crate::error::{Error, Result};
use crate::geo::RegionFilter;
use crate::inference::{BirdClassifier, SubjectDetector, YoloDetector};
use crate::metadata::{ExifToolWriter, MetadataWriter};
use crate::species::{KnowledgeBase, SpeciesTable};
use std::path::Path;
use tracing::{info, warn};

/// Per-request limits and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizeSettings {
    /// `top_k` used when a request omits it.
    pub default_top_k: usize,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
    /// Padding around detected subjects, in pixels.
    pub detector_padding: u32,
}

impl Default for RecognizeSettings {
    fn default() -> Self {
        let recognize = RecognizeConfig::default();
        Self {
            default_top_k: recognize.top_k,
            max_top_k: recognize.max_top_k,
            detector_padding: crate::constants::detector::DEFAULT_PADDING,
        }
    }
}

/// Models and reference data, built once at startup and never mutated.
pub struct AppContext {
    classifier: Option<BirdClassifier>,
    species: SpeciesTable,
    knowledge: Option<KnowledgeBase>,
    region_filter: Option<RegionFilter>,
    detector: Option<Box<dyn SubjectDetector>>,
    metadata_writer: Box<dyn MetadataWriter>,
    settings: RecognizeSettings,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("classifier", &self.classifier.is_some())
            .field("species", &self.species.len())
            .field("knowledge", &self.knowledge.as_ref().map(KnowledgeBase::len))
            .field("region_filter", &self.region_filter.is_some())
            .field("detector", &self.detector.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Load every component named by the configuration.
    ///
    /// The classifier and species table are required. The knowledge base,
    /// region data and detector are optional: failures are logged and the
    /// component is left out.
    pub fn load(config: &Config) -> Result<Self> {
        let paths = resolve_model_paths(&config.models)?;
        Self::load_from_paths(config, &paths)
    }

    /// Load components from already-resolved paths.
    pub fn load_from_paths(config: &Config, paths: &ModelPaths) -> Result<Self> {
        let inference = &config.inference;
        info!("Loading classifier: {}", paths.classifier.display());
        let classifier =
            BirdClassifier::from_onnx(&paths.classifier, inference.device, inference.workers)?;
        let species = SpeciesTable::load(&paths.species_info)?;

        let knowledge = optional("knowledge base", paths.knowledge_base.as_deref(), |path| {
            KnowledgeBase::load(path)
        });
        let region_filter = optional("region data", paths.region_data.as_deref(), |path| {
            RegionFilter::load(path)
        });
        let detector = optional("detector", paths.detector.as_deref(), |path| {
            YoloDetector::load(
                path,
                inference.device,
                inference.workers,
                inference.detector_confidence,
            )
        });

        let mut builder = Self::builder(species)
            .classifier(classifier)
            .settings(RecognizeSettings {
                default_top_k: config.recognize.top_k,
                max_top_k: config.recognize.max_top_k,
                detector_padding: inference.detector_padding,
            });
        if let Some(knowledge) = knowledge {
            builder = builder.knowledge_base(knowledge);
        }
        if let Some(filter) = region_filter {
            builder = builder.region_filter(filter);
        }
        if let Some(detector) = detector {
            builder = builder.detector(detector);
        }

        let context = builder.build();
        info!(
            "Ready: detector={}, knowledge base={}, region data={} ({} countries)",
            context.yolo_available(),
            context.knowledge.is_some(),
            context.ebird_available(),
            context
                .region_filter
                .as_ref()
                .map_or(0, RegionFilter::country_count)
        );
        Ok(context)
    }

    /// Start building a context around a species table.
    pub fn builder(species: SpeciesTable) -> AppContextBuilder {
        AppContextBuilder {
            context: Self {
                classifier: None,
                species,
                knowledge: None,
                region_filter: None,
                detector: None,
                metadata_writer: Box::new(ExifToolWriter::default()),
                settings: RecognizeSettings::default(),
            },
        }
    }

    /// The classifier, or `ModelUnavailable` if none is loaded.
    pub fn classifier(&self) -> Result<&BirdClassifier> {
        self.classifier.as_ref().ok_or(Error::ModelUnavailable {
            component: "classifier",
        })
    }

    /// Names indexed by class id.
    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    /// Knowledge base, if loaded.
    pub fn knowledge(&self) -> Option<&KnowledgeBase> {
        self.knowledge.as_ref()
    }

    /// Offline eBird lists, if loaded.
    pub fn region_filter(&self) -> Option<&RegionFilter> {
        self.region_filter.as_ref()
    }

    /// Subject detector, if loaded.
    pub fn detector(&self) -> Option<&dyn SubjectDetector> {
        self.detector.as_deref()
    }

    /// Metadata writer.
    pub fn metadata_writer(&self) -> &dyn MetadataWriter {
        self.metadata_writer.as_ref()
    }

    /// Request defaults and limits.
    pub fn settings(&self) -> &RecognizeSettings {
        &self.settings
    }

    /// Whether a subject detector is loaded.
    pub fn yolo_available(&self) -> bool {
        self.detector.is_some()
    }

    /// Whether offline eBird lists are loaded.
    pub fn ebird_available(&self) -> bool {
        self.region_filter.is_some()
    }
}

fn optional<T>(
    component: &str,
    path: Option<&Path>,
    load: impl FnOnce(&Path) -> Result<T>,
) -> Option<T> {
    let Some(path) = path else {
        info!("No {component} configured");
        return None;
    };
    match load(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to load {component} from {}: {}", path.display(), e.trace());
            None
        }
    }
}

/// Builder for [`AppContext`], used to assemble custom or test contexts.
pub struct AppContextBuilder {
    context: AppContext,
}

impl AppContextBuilder {
    /// Set the classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: BirdClassifier) -> Self {
        self.context.classifier = Some(classifier);
        self
    }

    /// Set the knowledge base.
    #[must_use]
    pub fn knowledge_base(mut self, knowledge: KnowledgeBase) -> Self {
        self.context.knowledge = Some(knowledge);
        self
    }

    /// Set the offline eBird lists.
    #[must_use]
    pub fn region_filter(mut self, filter: RegionFilter) -> Self {
        self.context.region_filter = Some(filter);
        self
    }

    /// Set the subject detector.
    #[must_use]
    pub fn detector(mut self, detector: impl SubjectDetector + 'static) -> Self {
        self.context.detector = Some(Box::new(detector));
        self
    }

    /// Replace the metadata writer.
    #[must_use]
    pub fn metadata_writer(mut self, writer: impl MetadataWriter + 'static) -> Self {
        self.context.metadata_writer = Box::new(writer);
        self
    }

    /// Set request defaults and limits.
    #[must_use]
    pub fn settings(mut self, settings: RecognizeSettings) -> Self {
        self.context.settings = settings;
        self
    }

    /// Finish building.
    pub fn build(self) -> AppContext {
        self.context
    }
}
