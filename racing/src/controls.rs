use bevy::prelude::*;

/// Driver intent for one tick.
///
/// Fields are independent: `forward` and `backward` may both be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

/// Anything that can report the current driver intent.
pub trait InputSource {
    fn snapshot(&self) -> Controls;
}

pub const KEY_FORWARD: KeyCode = KeyCode::KeyW;
pub const KEY_BACKWARD: KeyCode = KeyCode::KeyS;
pub const KEY_LEFT: KeyCode = KeyCode::KeyA;
pub const KEY_RIGHT: KeyCode = KeyCode::KeyD;
pub const KEY_BRAKE: KeyCode = KeyCode::Space;

impl InputSource for ButtonInput<KeyCode> {
    fn snapshot(&self) -> Controls {
        Controls {
            forward: self.pressed(KEY_FORWARD),
            backward: self.pressed(KEY_BACKWARD),
            left: self.pressed(KEY_LEFT),
            right: self.pressed(KEY_RIGHT),
            brake: self.pressed(KEY_BRAKE),
        }
    }
}

/// Snapshot read by the vehicle controller each frame.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ActiveControls(pub Controls);

/// Sample the keyboard once per frame. Last write wins.
pub fn sample_controls(keyboard: Res<ButtonInput<KeyCode>>, mut active: ResMut<ActiveControls>) {
    active.0 = keyboard.snapshot();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_maps_wasd_and_space() {
        let mut keys = ButtonInput::<KeyCode>::default();
        assert_eq!(keys.snapshot(), Controls::default());

        keys.press(KeyCode::KeyW);
        keys.press(KeyCode::KeyS);
        keys.press(KeyCode::Space);
        assert_eq!(
            keys.snapshot(),
            Controls {
                forward: true,
                backward: true,
                left: false,
                right: false,
                brake: true,
            }
        );

        keys.release(KeyCode::KeyW);
        keys.press(KeyCode::KeyA);
        let controls = keys.snapshot();
        assert!(!controls.forward);
        assert!(controls.left);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::ArrowUp);
        keys.press(KeyCode::Escape);
        assert_eq!(keys.snapshot(), Controls::default());
    }
}
