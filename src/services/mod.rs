//! Service layer: catalog parsing, generation, refinement and reporting.

pub mod asset_generator;
pub mod catalog_parser;
pub mod edge_case_augmenter;
pub mod outcome_classifier;
pub mod patch_parser;
pub mod pipeline;
pub mod prompts;
pub mod refinement_controller;

pub use asset_generator::AssetGenerator;
pub use catalog_parser::{filter_valid, parse_catalog, parse_records, CatalogRecord};
pub use edge_case_augmenter::EdgeCaseAugmenter;
pub use outcome_classifier::OutcomeClassifier;
pub use patch_parser::parse_patches;
pub use pipeline::QaPipeline;
pub use prompts::PromptBuilder;
pub use refinement_controller::RefinementController;
