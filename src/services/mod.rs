pub mod review_mapping;

pub use review_mapping::ReviewMappingService;
