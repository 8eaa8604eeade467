//! Injected rendering capability.
//!
//! The core renders into whatever the host supplies: a browser bridge, a
//! terminal, or nothing at all for headless simulation. Cosmetic calls may
//! fail when an addressed element is absent; callers log the failure and
//! carry on.

use std::time::Duration;
use thiserror::Error;

use crate::scene::{ControlPosition, Scene};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("element '{0}' is not present on the surface")]
    MissingElement(String),
}

/// A DOM-like render target plus the cosmetic effects the task triggers.
pub trait Surface {
    /// Remove everything currently displayed.
    fn clear(&mut self);

    /// Display a composed scene.
    fn render(&mut self, scene: &Scene);

    /// Outline the element with the given id.
    fn highlight(&mut self, element: &str, colour: &str) -> Result<(), SurfaceError>;

    /// Flash a control indicator; `hold` leaves it in the selected state.
    fn flash_control(
        &mut self,
        position: ControlPosition,
        hold: bool,
        interval: Duration,
    ) -> Result<(), SurfaceError>;

    fn set_background(&mut self, colour: &str);

    fn set_cursor_visible(&mut self, visible: bool);
}

/// Surface that accepts everything and displays nothing. Used by the headless
/// simulator and as a base for test doubles.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn clear(&mut self) {}

    fn render(&mut self, _scene: &Scene) {}

    fn highlight(&mut self, _element: &str, _colour: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn flash_control(
        &mut self,
        _position: ControlPosition,
        _hold: bool,
        _interval: Duration,
    ) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_background(&mut self, _colour: &str) {}

    fn set_cursor_visible(&mut self, _visible: bool) {}
}
