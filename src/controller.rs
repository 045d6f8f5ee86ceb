//! Controller button and axis decoding.
//!
//! The runtime reports buttons as two 64 bit masks (pressed and touched) plus
//! five two-dimensional axes. Only the fields a Vive-style wand exposes are
//! decoded; the system button can't be read at all, pressing it makes the
//! controller stop reporting.

use serde::Serialize;

/// Divisor applied to the raw pressed and touched masks on the wire.
pub const BUTTON_MASK_SCALE: f64 = 8_589_934_592.0; // 2^33
/// Divisor applied to the isolated trackpad touch bit on the wire.
pub const TRACKPAD_TOUCH_SCALE: f64 = 4_294_967_296.0; // 2^32

const MENU_BIT: u32 = 1;
const GRIP_BIT: u32 = 2;
const TRACKPAD_BIT: u32 = 32;

const TRACKPAD_AXIS: usize = 0;
const TRIGGER_AXIS: usize = 1;

#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize)]
pub struct Axis {
    pub x: f32,
    pub y: f32,
}

/// Raw snapshot as read from the runtime.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize)]
pub struct RawControllerState {
    pub packet_num: u32,
    pub button_pressed: u64,
    pub button_touched: u64,
    pub axis: [Axis; 5],
}

/// Decoded view of a [`RawControllerState`], rebuilt every tick.
#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
pub struct ControllerState {
    /// 0.0 is fully released. The y component of the trigger axis is always 0.
    pub trigger: f32,
    /// -1.0 to 1.0
    pub trackpad_x: f32,
    pub trackpad_y: f32,
    pub button_pressed: u64,
    pub button_touched: u64,
    pub menu_button: bool,
    pub grip_button: bool,
    pub trackpad_pressed: bool,
    pub trackpad_touched: bool,
}

fn bit(mask: u64, index: u32) -> bool {
    (mask >> index) & 1 == 1
}

impl From<&RawControllerState> for ControllerState {
    fn from(raw: &RawControllerState) -> Self {
        Self {
            trigger: raw.axis[TRIGGER_AXIS].x,
            trackpad_x: raw.axis[TRACKPAD_AXIS].x,
            trackpad_y: raw.axis[TRACKPAD_AXIS].y,
            button_pressed: raw.button_pressed,
            button_touched: raw.button_touched,
            menu_button: bit(raw.button_pressed, MENU_BIT),
            grip_button: bit(raw.button_pressed, GRIP_BIT),
            trackpad_pressed: bit(raw.button_pressed, TRACKPAD_BIT),
            trackpad_touched: bit(raw.button_touched, TRACKPAD_BIT),
        }
    }
}

impl ControllerState {
    pub fn pressed_normalized(&self) -> f32 {
        (self.button_pressed as f64 / BUTTON_MASK_SCALE) as f32
    }

    pub fn touched_normalized(&self) -> f32 {
        (self.button_touched as f64 / BUTTON_MASK_SCALE) as f32
    }

    /// The trackpad touch bit in place, scaled down to 0.0 or 1.0.
    pub fn trackpad_touched_normalized(&self) -> f32 {
        let masked = self.button_touched & (1 << TRACKPAD_BIT);
        (masked as f64 / TRACKPAD_TOUCH_SCALE) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(pressed: u64, touched: u64) -> ControllerState {
        ControllerState::from(&RawControllerState {
            button_pressed: pressed,
            button_touched: touched,
            ..Default::default()
        })
    }

    #[test]
    fn menu_button_is_bit_one() {
        let state = decode(2, 0);
        assert!(state.menu_button);
        assert!(!state.grip_button);
        assert!(!state.trackpad_pressed);
        assert!(!state.trackpad_touched);
    }

    #[test]
    fn grip_button_is_bit_two() {
        let state = decode(4, 0);
        assert!(state.grip_button);
        assert!(!state.menu_button);
    }

    #[test]
    fn trackpad_press_is_bit_32() {
        let state = decode(1 << 32, 0);
        assert!(state.trackpad_pressed);
        assert!(!state.menu_button);
        assert_eq!(state.pressed_normalized(), 0.5);
    }

    #[test]
    fn trackpad_touch_is_bit_32() {
        let state = decode(0, 1 << 32);
        assert!(state.trackpad_touched);
        assert!(!state.trackpad_pressed);
        assert_eq!(state.trackpad_touched_normalized(), 1.0);
        assert_eq!(state.touched_normalized(), 0.5);
    }

    #[test]
    fn untouched_trackpad_normalizes_to_zero() {
        let state = decode(0, 2);
        assert!(!state.trackpad_touched);
        assert_eq!(state.trackpad_touched_normalized(), 0.0);
    }

    #[test]
    fn axes_are_picked_from_trigger_and_trackpad_slots() {
        let mut raw = RawControllerState::default();
        raw.axis[0] = Axis { x: -0.25, y: 0.75 };
        raw.axis[1] = Axis { x: 0.5, y: 0. };
        raw.axis[2] = Axis { x: 9., y: 9. };
        let state = ControllerState::from(&raw);
        assert_eq!(state.trigger, 0.5);
        assert_eq!(state.trackpad_x, -0.25);
        assert_eq!(state.trackpad_y, 0.75);
    }
}
