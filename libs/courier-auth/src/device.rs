/// Source of the stable device identifier sent with API-authenticated calls
pub trait DeviceIdentity: Send + Sync {
    fn device_id(&self) -> String;
}

/// Device identity fixed at construction (configuration, tests)
#[derive(Debug, Clone)]
pub struct FixedDeviceIdentity {
    id: String,
}

impl FixedDeviceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl DeviceIdentity for FixedDeviceIdentity {
    fn device_id(&self) -> String {
        self.id.clone()
    }
}
