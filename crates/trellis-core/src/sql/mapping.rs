//! Transport description for array-of-row values; must not convert values.

///
/// ROW_ARRAY_STORE_TYPE
///
/// Default storage name for the array-of-generic-rows transport form.
///

pub const ROW_ARRAY_STORE_TYPE: &str = "record[]";

///
/// TypeMappingParameters
///
/// Shared relational type-mapping facet set. A provider specializes a
/// generic mapping by cloning it with concrete facets; absent facets mean
/// "inherit the mapping's defaults".
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TypeMappingParameters {
    /// Provider storage name override.
    pub store_type: Option<String>,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl TypeMappingParameters {
    #[must_use]
    pub fn with_store_type(mut self, store_type: String) -> Self {
        self.store_type = Some(store_type);
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

///
/// RowArrayTypeMapping
///
/// Describes how an in-memory matrix of scalars (rows by columns) travels
/// to and from the provider's native "array of rows" representation. Pure
/// description: value conversion belongs to the general type-mapping
/// infrastructure outside this core. Equality is by descriptive
/// parameters, never identity.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct RowArrayTypeMapping {
    parameters: TypeMappingParameters,
}

impl RowArrayTypeMapping {
    /// Specialize this mapping with concrete facets, e.g. when binding it
    /// to one column. Runtime behavior is unchanged.
    #[must_use]
    pub fn with_parameters(&self, parameters: TypeMappingParameters) -> Self {
        let mut mapping = self.clone();
        mapping.parameters = parameters;
        mapping
    }

    #[must_use]
    pub const fn parameters(&self) -> &TypeMappingParameters {
        &self.parameters
    }

    /// Provider storage name; the `record[]` family unless a facet
    /// overrides it.
    #[must_use]
    pub fn store_type(&self) -> &str {
        self.parameters
            .store_type
            .as_deref()
            .unwrap_or(ROW_ARRAY_STORE_TYPE)
    }
}
