//! Unary control surface.
//!
//! [`Client`] wraps the request/response operations of the control
//! service. Every call obtains a fresh context from the channel's factory
//! and applies the client-wide default deadline. Unary calls bypass any
//! session stream entirely.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use icon_common::{
    IconError, IconResult, PartPropertyMap, PartPropertyValue, SlotPartMap,
    TimestampedPartProperties,
};
use icon_wire::service;
use tracing::warn;

use crate::transport::{CallContext, CallContextFactory, Channel, IconApi};

/// Default per-call deadline of [`Client`].
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Operational status of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationalStatus {
    Disabled,
    Enabled,
    /// Faulted, with the reason reported by the server.
    Faulted(String),
}

impl OperationalStatus {
    pub fn from_wire(proto: &service::OperationalStatus) -> IconResult<Self> {
        match proto.state {
            service::OperationalState::Disabled => Ok(Self::Disabled),
            service::OperationalState::Enabled => Ok(Self::Enabled),
            service::OperationalState::Faulted => Ok(Self::Faulted(proto.fault_reason.clone())),
            service::OperationalState::Unspecified => Err(IconError::invalid_argument(
                "Operational status has unspecified state",
            )),
        }
    }
}

/// Snapshot of the server configuration, including per-part config.
#[derive(Debug, Clone)]
pub struct RobotConfig {
    proto: service::GetConfigResponse,
}

impl RobotConfig {
    pub fn new(proto: service::GetConfigResponse) -> Self {
        Self { proto }
    }

    /// The control loop frequency, in Hz.
    pub fn control_frequency_hz(&self) -> f64 {
        self.proto.control_frequency_hz
    }

    /// The server name that appears in logs and topic names.
    pub fn server_name(&self) -> &str {
        &self.proto.server_name
    }

    /// The config of `part_name`, or `NotFound`.
    pub fn part_config(&self, part_name: &str) -> IconResult<&service::PartConfig> {
        self.proto
            .part_configs
            .iter()
            .find(|config| config.name == part_name)
            .ok_or_else(|| {
                IconError::not_found(format!("Config does not contain Part '{part_name}'"))
            })
    }

    /// The feature interfaces implemented by `part_name`.
    pub fn part_feature_interfaces(
        &self,
        part_name: &str,
    ) -> IconResult<service::FeatureInterfaces> {
        Ok(self.part_config(part_name)?.feature_interfaces)
    }
}

/// Client for the unary control surface of one server.
pub struct Client {
    api: Arc<dyn IconApi>,
    context_factory: CallContextFactory,
    timeout: Duration,
}

impl Client {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            api: channel.api(),
            context_factory: channel.call_context_factory(),
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    /// Overrides the per-call deadline applied to every operation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn call_context(&self) -> CallContext {
        let mut context = (self.context_factory)();
        context.deadline = Some(self.timeout);
        context
    }

    pub fn enable(&self) -> IconResult<()> {
        self.api.enable(&self.call_context())
    }

    pub fn disable(&self) -> IconResult<()> {
        self.api.disable(&self.call_context())
    }

    pub fn clear_faults(&self) -> IconResult<()> {
        self.api.clear_faults(&self.call_context())
    }

    pub fn get_operational_status(&self) -> IconResult<OperationalStatus> {
        let proto = self.api.get_operational_status(&self.call_context())?;
        OperationalStatus::from_wire(&proto)
    }

    pub fn get_config(&self) -> IconResult<RobotConfig> {
        Ok(RobotConfig::new(self.api.get_config(&self.call_context())?))
    }

    /// Latest sensed state of all parts.
    pub fn get_status(&self) -> IconResult<service::GetStatusResponse> {
        self.api.get_status(&self.call_context())
    }

    /// Latest sensed state of one part, or `NotFound`.
    pub fn get_single_part_status(&self, part_name: &str) -> IconResult<service::PartStatus> {
        let robot_status = self.get_status()?;
        robot_status
            .part_status
            .get(part_name)
            .cloned()
            .ok_or_else(|| {
                IconError::not_found(format!(
                    "Robot status does not contain Part status for Part '{part_name}'"
                ))
            })
    }

    /// Best effort; the caller must expect the transport to drop.
    pub fn restart_server(&self) -> IconResult<()> {
        self.api.restart_server(&self.call_context())
    }

    pub fn list_parts(&self) -> IconResult<Vec<String>> {
        self.api.list_parts(&self.call_context())
    }

    /// Parts compatible with all of `action_type_names`.
    pub fn list_compatible_parts(&self, action_type_names: &[String]) -> IconResult<Vec<String>> {
        self.api
            .list_compatible_parts(&self.call_context(), action_type_names)
    }

    /// All action signatures, sorted by type name. Duplicate type names
    /// are kept and logged.
    pub fn list_action_signatures(&self) -> IconResult<Vec<service::ActionSignature>> {
        let mut signatures = self.api.list_action_signatures(&self.call_context())?;
        signatures.sort_by(|a, b| a.action_type_name.cmp(&b.action_type_name));
        for pair in signatures.windows(2) {
            if pair[0].action_type_name == pair[1].action_type_name {
                warn!(
                    "Server returned duplicate action type name \"{}\"",
                    pair[0].action_type_name
                );
            }
        }
        Ok(signatures)
    }

    /// The signature of `action_type_name`, or `NotFound` when the type is
    /// unknown.
    pub fn get_action_signature_by_name(
        &self,
        action_type_name: &str,
    ) -> IconResult<service::ActionSignature> {
        self.api
            .get_action_signature_by_name(&self.call_context(), action_type_name)?
            .ok_or_else(|| {
                IconError::not_found(format!(
                    "Could not get action signature: action type \"{action_type_name}\" \
                     not found."
                ))
            })
    }

    /// Server-side check whether `action_type_name` can control
    /// `part_name`.
    pub fn is_action_compatible(
        &self,
        part_name: &str,
        action_type_name: &str,
    ) -> IconResult<bool> {
        self.api.is_action_compatible(
            &self.call_context(),
            &service::IsActionCompatibleRequest {
                action_type_name: action_type_name.to_string(),
                target: service::CompatibilityTarget::PartName(part_name.to_string()),
            },
        )
    }

    /// Server-side check whether `action_type_name` accepts the given slot
    /// binding.
    pub fn is_action_compatible_with_slot_part_map(
        &self,
        slot_part_map: &SlotPartMap,
        action_type_name: &str,
    ) -> IconResult<bool> {
        self.api.is_action_compatible(
            &self.call_context(),
            &service::IsActionCompatibleRequest {
                action_type_name: action_type_name.to_string(),
                target: service::CompatibilityTarget::SlotPartMap(slot_part_map.clone()),
            },
        )
    }

    /// The global speed override factor.
    pub fn get_speed_override(&self) -> IconResult<f64> {
        self.api.get_speed_override(&self.call_context())
    }

    pub fn set_speed_override(&self, override_factor: f64) -> IconResult<()> {
        self.api
            .set_speed_override(&self.call_context(), override_factor)
    }

    /// Sets part properties. Returns once the server accepted the request,
    /// which may be before the properties are observable.
    pub fn set_part_properties(&self, property_map: &PartPropertyMap) -> IconResult<()> {
        let mut request = service::SetPartPropertiesRequest::default();
        for (part_name, properties) in &property_map.properties {
            let mut values = service::PartPropertyValues::default();
            for (property_name, property_value) in properties {
                values
                    .property_values_by_name
                    .insert(property_name.clone(), property_value.to_wire());
            }
            request
                .part_properties_by_part_name
                .insert(part_name.clone(), values);
        }
        self.api.set_part_properties(&self.call_context(), &request)
    }

    /// Reads all part properties, with the wall-clock and control-loop
    /// times at which they were captured.
    pub fn get_part_properties(&self) -> IconResult<TimestampedPartProperties> {
        let response = self.api.get_part_properties(&self.call_context())?;

        let timestamp_wall = UNIX_EPOCH
            + Duration::new(
                u64::try_from(response.timestamp_wall.seconds).map_err(|_| {
                    IconError::invalid_argument(format!(
                        "Part property wall timestamp is negative: {}",
                        response.timestamp_wall.seconds
                    ))
                })?,
                response.timestamp_wall.nanos.max(0) as u32,
            );
        let timestamp_control = Duration::new(
            response.timestamp_control.seconds.max(0) as u64,
            response.timestamp_control.nanos.max(0) as u32,
        );

        let mut properties = TimestampedPartProperties {
            timestamp_wall,
            timestamp_control,
            properties: Default::default(),
        };
        for (part_name, values) in &response.part_properties_by_part_name {
            let part_entry = properties.properties.entry(part_name.clone()).or_default();
            for (property_name, value) in &values.property_values_by_name {
                part_entry.insert(property_name.clone(), PartPropertyValue::from_wire(value)?);
            }
        }
        Ok(properties)
    }
}
