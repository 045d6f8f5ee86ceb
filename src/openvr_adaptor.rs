use crate::controller::{Axis, RawControllerState};
use crate::error::TrackingError;
use crate::tracking::{DeviceClass, DeviceSlot, Hand, TrackedPose, TrackingSystem};

impl DeviceClass {
    fn from_openvr_type(device_class: openvr::TrackedDeviceClass) -> Option<Self> {
        match device_class {
            openvr::TrackedDeviceClass::HMD => Some(DeviceClass::HMD),
            openvr::TrackedDeviceClass::Controller => Some(DeviceClass::Controller),
            openvr::TrackedDeviceClass::GenericTracker => Some(DeviceClass::Tracker),
            openvr::TrackedDeviceClass::TrackingReference => Some(DeviceClass::TrackingReference),
            _ => None,
        }
    }
}

impl From<openvr::TrackedControllerRole> for Hand {
    fn from(role: openvr::TrackedControllerRole) -> Self {
        match role {
            openvr::TrackedControllerRole::LeftHand => Hand::Left,
            openvr::TrackedControllerRole::RightHand => Hand::Right,
        }
    }
}

impl From<&openvr::ControllerState> for RawControllerState {
    fn from(state: &openvr::ControllerState) -> Self {
        let mut axis = [Axis::default(); 5];
        for (raw, read) in axis.iter_mut().zip(state.axis.iter()) {
            *raw = Axis {
                x: read.x,
                y: read.y,
            };
        }
        Self {
            packet_num: state.packet_num,
            button_pressed: state.button_pressed,
            button_touched: state.button_touched,
            axis,
        }
    }
}

/// OpenVR runtime, held for the life of the bridge.
///
/// The runtime is shut down when this is dropped.
pub struct OpenVrSystem {
    /// Context needs to be kept around for interop reasons
    /// Otherwise you get a segfault
    #[allow(dead_code)]
    context: openvr::Context,
    openvr_system: openvr::System,
}

impl OpenVrSystem {
    pub fn new() -> Result<Self, TrackingError> {
        let context = unsafe { openvr::init(openvr::ApplicationType::Other) }
            .map_err(|error| TrackingError::Init(error.to_string()))?;
        let openvr_system = context
            .system()
            .map_err(|error| TrackingError::Init(error.to_string()))?;
        Ok(Self {
            context,
            openvr_system,
        })
    }

    fn tracked_poses(&self) -> openvr::TrackedDevicePoses {
        self.openvr_system
            .device_to_absolute_tracking_pose(openvr::TrackingUniverseOrigin::Standing, 0.0)
    }
}

impl TrackingSystem for OpenVrSystem {
    fn device_slots(&self) -> Vec<DeviceSlot> {
        self.tracked_poses()
            .iter()
            .enumerate()
            .map(|(index, pose)| {
                let index = index as openvr::TrackedDeviceIndex;
                DeviceSlot {
                    index,
                    connected: pose.device_is_connected(),
                    class: DeviceClass::from_openvr_type(
                        self.openvr_system.tracked_device_class(index),
                    ),
                    role: self
                        .openvr_system
                        .get_controller_role_for_tracked_device_index(index)
                        .map(Hand::from),
                }
            })
            .collect()
    }

    fn poses(&self) -> Vec<TrackedPose> {
        self.tracked_poses()
            .iter()
            .map(|pose| TrackedPose {
                valid: pose.pose_is_valid(),
                matrix: *pose.device_to_absolute_tracking(),
            })
            .collect()
    }

    fn controller_state(&self, index: u32) -> Option<RawControllerState> {
        self.openvr_system
            .controller_state(index)
            .map(|state| RawControllerState::from(&state))
    }
}
