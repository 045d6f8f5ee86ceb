use crate::controller::RawControllerState;
use crate::error::TrackingError;
use crate::pose::PoseMatrix;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Device classes the bridge forwards.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize)]
pub enum DeviceClass {
    HMD,
    Tracker,
    Controller,
    TrackingReference,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 4] = [
        DeviceClass::HMD,
        DeviceClass::Tracker,
        DeviceClass::Controller,
        DeviceClass::TrackingReference,
    ];

    /// Name used as the first OSC address segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::HMD => "hmd",
            DeviceClass::Tracker => "tracker",
            DeviceClass::Controller => "controller",
            DeviceClass::TrackingReference => "tracking reference",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmd" => Ok(DeviceClass::HMD),
            "tracker" => Ok(DeviceClass::Tracker),
            "controller" => Ok(DeviceClass::Controller),
            "tracking reference" | "tracking-reference" | "tracking_reference" | "reference" => {
                Ok(DeviceClass::TrackingReference)
            }
            other => Err(format!(
                "unknown device type '{}' (expected hmd, tracker, controller or tracking reference)",
                other
            )),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum Hand {
    Left,
    Right,
}

/// One slot of the runtime's device table as seen right now.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct DeviceSlot {
    pub index: u32,
    pub connected: bool,
    /// `None` for classes the bridge doesn't forward, or an empty slot.
    pub class: Option<DeviceClass>,
    pub role: Option<Hand>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct TrackedPose {
    pub valid: bool,
    pub matrix: PoseMatrix,
}

/// The tracking runtime as the bridge needs it.
///
/// Implemented by the OpenVR adaptor, and by in-memory fakes in tests.
pub trait TrackingSystem {
    /// Every slot in the runtime's device table.
    fn device_slots(&self) -> Vec<DeviceSlot>;

    /// Current poses for all slots, indexed by slot.
    fn poses(&self) -> Vec<TrackedPose>;

    fn controller_state(&self, index: u32) -> Option<RawControllerState>;
}

impl<T: TrackingSystem + ?Sized> TrackingSystem for Box<T> {
    fn device_slots(&self) -> Vec<DeviceSlot> {
        (**self).device_slots()
    }

    fn poses(&self) -> Vec<TrackedPose> {
        (**self).poses()
    }

    fn controller_state(&self, index: u32) -> Option<RawControllerState> {
        (**self).controller_state(index)
    }
}

/// Open the tracking runtime this build supports.
#[cfg(feature = "openvr")]
pub fn open_runtime() -> Result<Box<dyn TrackingSystem>, TrackingError> {
    Ok(Box::new(crate::openvr_adaptor::OpenVrSystem::new()?))
}

#[cfg(not(feature = "openvr"))]
pub fn open_runtime() -> Result<Box<dyn TrackingSystem>, TrackingError> {
    Err(TrackingError::Unsupported)
}

/// A device found at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    /// Per-class ordinal starting at 1, used in the OSC address.
    id: String,
    index: u32,
    class: DeviceClass,
}

impl Device {
    pub fn new(id: impl Into<String>, index: u32, class: DeviceClass) -> Self {
        Self {
            id: id.into(),
            index,
            class,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn address(&self) -> String {
        format!("/{}/{}", self.class, self.id)
    }
}

/// Devices bucketed by class. Built once and never rescanned.
#[derive(Debug, Default, Clone)]
pub struct DeviceInventory {
    devices: HashMap<DeviceClass, Vec<Device>>,
}

impl DeviceInventory {
    pub fn discover<T: TrackingSystem + ?Sized>(system: &T) -> Self {
        Self::from_slots(&system.device_slots())
    }

    pub fn from_slots(slots: &[DeviceSlot]) -> Self {
        let mut devices: HashMap<DeviceClass, Vec<Device>> = HashMap::new();
        for slot in slots.iter().filter(|slot| slot.connected) {
            let class = match slot.class {
                Some(class) => class,
                None => {
                    debug!("Skipping slot {} with unsupported device class", slot.index);
                    continue;
                }
            };
            let bucket = devices.entry(class).or_default();
            let device = Device::new((bucket.len() + 1).to_string(), slot.index, class);
            bucket.push(device);
        }
        Self { devices }
    }

    pub fn of_class(&self, class: DeviceClass) -> &[Device] {
        self.devices.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All devices in class order, then discovery order.
    pub fn device_list(&self) -> Vec<&Device> {
        DeviceClass::ALL
            .iter()
            .flat_map(|class| self.of_class(*class))
            .collect()
    }
}

#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct ControllerRoles {
    pub left: Option<u32>,
    pub right: Option<u32>,
}

impl ControllerRoles {
    pub fn complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

/// Find which slots currently hold the left and right hand controllers.
pub fn resolve_controller_roles(slots: &[DeviceSlot]) -> ControllerRoles {
    let mut roles = ControllerRoles::default();
    for slot in slots
        .iter()
        .filter(|slot| slot.class == Some(DeviceClass::Controller))
    {
        match slot.role {
            Some(Hand::Left) => roles.left = Some(slot.index),
            Some(Hand::Right) => roles.right = Some(slot.index),
            None => (),
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(index: u32, class: Option<DeviceClass>, role: Option<Hand>) -> DeviceSlot {
        DeviceSlot {
            index,
            connected: true,
            class,
            role,
        }
    }

    #[test]
    fn parses_track_names() {
        assert_eq!("hmd".parse::<DeviceClass>(), Ok(DeviceClass::HMD));
        assert_eq!(
            "Controller".parse::<DeviceClass>(),
            Ok(DeviceClass::Controller)
        );
        assert_eq!(
            "tracking reference".parse::<DeviceClass>(),
            Ok(DeviceClass::TrackingReference)
        );
        assert_eq!(
            "reference".parse::<DeviceClass>(),
            Ok(DeviceClass::TrackingReference)
        );
        assert!("lighthouse".parse::<DeviceClass>().is_err());
    }

    #[test]
    fn ids_are_per_class_ordinals() {
        let slots = [
            slot(0, Some(DeviceClass::HMD), None),
            slot(1, Some(DeviceClass::TrackingReference), None),
            slot(3, Some(DeviceClass::Controller), Some(Hand::Left)),
            slot(4, Some(DeviceClass::Controller), Some(Hand::Right)),
        ];
        let inventory = DeviceInventory::from_slots(&slots);
        let controllers = inventory.of_class(DeviceClass::Controller);
        assert_eq!(controllers.len(), 2);
        assert_eq!(controllers[0].id(), "1");
        assert_eq!(controllers[0].index(), 3);
        assert_eq!(controllers[1].address(), "/controller/2");
        assert_eq!(inventory.of_class(DeviceClass::HMD)[0].address(), "/hmd/1");
        assert_eq!(
            inventory.of_class(DeviceClass::TrackingReference)[0].address(),
            "/tracking reference/1"
        );
        assert_eq!(inventory.len(), 4);
    }

    #[test]
    fn device_list_is_in_class_order() {
        let slots = [
            slot(0, Some(DeviceClass::Controller), Some(Hand::Left)),
            slot(1, Some(DeviceClass::TrackingReference), None),
            slot(2, Some(DeviceClass::HMD), None),
            slot(3, Some(DeviceClass::Tracker), None),
        ];
        let inventory = DeviceInventory::from_slots(&slots);
        let addresses: Vec<String> = inventory
            .device_list()
            .iter()
            .map(|device| device.address())
            .collect();
        assert_eq!(
            addresses,
            [
                "/hmd/1",
                "/tracker/1",
                "/controller/1",
                "/tracking reference/1"
            ]
        );
    }

    #[cfg(not(feature = "openvr"))]
    #[test]
    fn runtime_without_openvr_feature_says_how_to_enable_it() {
        let error = open_runtime().err().unwrap();
        assert!(matches!(error, TrackingError::Unsupported));
        assert!(error.to_string().contains("--features openvr"));
    }

    #[test]
    fn skips_disconnected_and_unknown_slots() {
        let mut slots = vec![
            slot(0, Some(DeviceClass::HMD), None),
            slot(1, None, None),
            slot(2, Some(DeviceClass::Tracker), None),
        ];
        slots[2].connected = false;
        let inventory = DeviceInventory::from_slots(&slots);
        assert_eq!(inventory.len(), 1);
        assert!(inventory.of_class(DeviceClass::Tracker).is_empty());
    }

    #[test]
    fn resolves_both_hands() {
        let slots = [
            slot(0, Some(DeviceClass::HMD), None),
            slot(1, Some(DeviceClass::Controller), Some(Hand::Right)),
            slot(2, Some(DeviceClass::Controller), Some(Hand::Left)),
        ];
        let roles = resolve_controller_roles(&slots);
        assert_eq!(roles.left, Some(2));
        assert_eq!(roles.right, Some(1));
        assert!(roles.complete());
    }

    #[test]
    fn slot_zero_counts_as_resolved() {
        let slots = [
            slot(0, Some(DeviceClass::Controller), Some(Hand::Left)),
            slot(1, Some(DeviceClass::Controller), Some(Hand::Right)),
        ];
        assert!(resolve_controller_roles(&slots).complete());
    }

    #[test]
    fn roles_ignore_non_controllers() {
        let slots = [
            slot(0, Some(DeviceClass::Tracker), Some(Hand::Left)),
            slot(1, Some(DeviceClass::Controller), Some(Hand::Right)),
            slot(2, Some(DeviceClass::Controller), None),
        ];
        let roles = resolve_controller_roles(&slots);
        assert_eq!(roles.left, None);
        assert_eq!(roles.right, Some(1));
        assert!(!roles.complete());
    }
}
