pub mod review_mapping;

pub use review_mapping::configure_review_mapping_routes;
