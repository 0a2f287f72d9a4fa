//! Resource type definitions for the IBM Cloud provider

use certbind_core::provider::ResourceType;
use certbind_core::schema::ResourceSchema;

use crate::alb_cert;

pub struct AlbCertType;

impl ResourceType for AlbCertType {
    fn name(&self) -> &'static str {
        alb_cert::RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        alb_cert::schema()
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(AlbCertType)]
}
