use crate::controller::ControllerState;
use crate::pose::Pose;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
use serde::Serialize;

/// OSC "immediately" time tag.
pub const IMMEDIATELY: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

/// One device sampled during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSample {
    address: String,
    pose: Pose,
    #[serde(skip_serializing_if = "Option::is_none")]
    controller: Option<ControllerState>,
}

impl DeviceSample {
    pub fn new(address: String, pose: Pose, controller: Option<ControllerState>) -> Self {
        Self {
            address,
            pose,
            controller,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Pose values first, then the controller extras in fixed order.
    pub fn to_message(&self) -> OscMessage {
        let mut args: Vec<OscType> = self.pose.values().into_iter().map(OscType::Float).collect();
        if let Some(state) = &self.controller {
            args.extend([
                OscType::Float(state.trigger),
                OscType::Float(state.trackpad_x),
                OscType::Float(state.trackpad_y),
                OscType::Float(state.pressed_normalized()),
                OscType::Float(state.touched_normalized()),
                OscType::Bool(state.menu_button),
                OscType::Bool(state.trackpad_pressed),
                OscType::Float(state.trackpad_touched_normalized()),
                OscType::Bool(state.grip_button),
            ]);
        }
        OscMessage {
            addr: self.address.clone(),
            args,
        }
    }
}

/// Everything sampled in one tick, sent as a single bundle.
#[derive(Debug, Serialize)]
pub struct TrackedObjects {
    ts: u128,
    trackers: Vec<DeviceSample>,
}

impl TrackedObjects {
    pub fn new(ts: u128, trackers: Vec<DeviceSample>) -> Self {
        Self { ts, trackers }
    }

    pub fn samples(&self) -> &[DeviceSample] {
        &self.trackers
    }

    pub fn to_bundle(&self) -> OscBundle {
        OscBundle {
            timetag: IMMEDIATELY,
            content: self
                .trackers
                .iter()
                .map(|sample| OscPacket::Message(sample.to_message()))
                .collect(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, rosc::OscError> {
        rosc::encoder::encode(&OscPacket::Bundle(self.to_bundle()))
    }
}
