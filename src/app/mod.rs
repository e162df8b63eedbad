pub mod ports;
pub mod clean_use_case;
pub mod transform_use_case;
pub mod store_use_case;
