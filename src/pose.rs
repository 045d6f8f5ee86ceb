use nalgebra as na;
use serde::Serialize;

/// Row-major 3x4 device-to-absolute-tracking matrix as OpenVR reports it.
pub type PoseMatrix = [[f32; 4]; 3];

/// How orientation is put on the wire.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseMode {
    Euler,
    Quaternion,
}

/// Position plus yaw/pitch/roll in degrees.
#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct EulerPose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl EulerPose {
    pub fn values(&self) -> [f32; 6] {
        [self.x, self.y, self.z, self.yaw, self.pitch, self.roll]
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct QuaternionPose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
}

impl QuaternionPose {
    pub fn values(&self) -> [f32; 7] {
        [self.x, self.y, self.z, self.w, self.qx, self.qy, self.qz]
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
#[serde(untagged)]
pub enum Pose {
    Euler(EulerPose),
    Quaternion(QuaternionPose),
}

impl Pose {
    /// Pose values in wire order.
    pub fn values(&self) -> Vec<f32> {
        match self {
            Pose::Euler(pose) => pose.values().to_vec(),
            Pose::Quaternion(pose) => pose.values().to_vec(),
        }
    }
}

pub trait OpenVRPose {
    fn to_position(&self) -> na::Point3<f32>;
    fn to_rotation(&self) -> na::UnitQuaternion<f32>;
    fn to_euler(&self) -> EulerPose;

    /// Sent with `w >= 0`, so a rotation has one wire form.
    fn to_quaternion(&self) -> QuaternionPose {
        let position = self.to_position();
        let mut rotation = self.to_rotation().into_inner();
        if rotation.w < 0. {
            rotation = -rotation;
        }
        QuaternionPose {
            x: position.x,
            y: position.y,
            z: position.z,
            w: rotation.w,
            qx: rotation.i,
            qy: rotation.j,
            qz: rotation.k,
        }
    }

    fn to_pose(&self, mode: PoseMode) -> Pose {
        match mode {
            PoseMode::Euler => Pose::Euler(self.to_euler()),
            PoseMode::Quaternion => Pose::Quaternion(self.to_quaternion()),
        }
    }
}

impl OpenVRPose for PoseMatrix {
    /// Translation column, in the runtime's own axes.
    fn to_position(&self) -> na::Point3<f32> {
        na::Point3::new(self[0][3], self[1][3], self[2][3])
    }

    fn to_rotation(&self) -> na::UnitQuaternion<f32> {
        let m = self;
        let rotation = na::Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        );
        na::UnitQuaternion::from_rotation_matrix(&na::Rotation3::from_matrix_unchecked(rotation))
    }

    /// Yaw, pitch and roll are taken straight off the matrix entries and are
    /// not a strict Tait-Bryan decomposition. Receivers depend on this exact
    /// form so it is kept as is.
    fn to_euler(&self) -> EulerPose {
        let m = self;
        EulerPose {
            x: m[0][3],
            y: m[1][3],
            z: m[2][3],
            yaw: m[1][0].atan2(m[0][0]).to_degrees(),
            pitch: m[2][0].atan2(m[0][0]).to_degrees(),
            roll: m[2][1].atan2(m[2][2]).to_degrees(),
        }
    }
}
