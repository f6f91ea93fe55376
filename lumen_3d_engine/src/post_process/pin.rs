/// Post-process pins: named texture slots on a stage.

use slotmap::Key;
use crate::render_engine::TextureHandle;

/// Which side of a stage a pin lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    fn label(self) -> &'static str {
        match self {
            PinDirection::Input => "input",
            PinDirection::Output => "output",
        }
    }
}

/// One named slot holding an optional texture
#[derive(Debug, Clone)]
pub struct Pin {
    name: String,
    texture: Option<TextureHandle>,
}

impl Pin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }
}

/// Ordered set of pins on one side of a stage.
///
/// Pin names double as the effect parameter names the texture is bound to.
#[derive(Debug, Clone)]
pub struct PinSet {
    direction: PinDirection,
    pins: Vec<Pin>,
}

impl PinSet {
    pub fn new<S: AsRef<str>>(direction: PinDirection, names: &[S]) -> Self {
        Self {
            direction,
            pins: names
                .iter()
                .map(|n| Pin { name: n.as_ref().to_string(), texture: None })
                .collect(),
        }
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    /// Name of pin `index` (`None` if out of range)
    pub fn name(&self, index: usize) -> Option<&str> {
        self.pins.get(index).map(|p| p.name.as_str())
    }

    /// Texture bound to pin `index` (`None` if unbound or out of range)
    pub fn texture(&self, index: usize) -> Option<TextureHandle> {
        self.pins.get(index).and_then(|p| p.texture)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.pins.iter().position(|p| p.name == name)
    }

    pub fn all_bound(&self) -> bool {
        self.pins.iter().all(|p| p.texture.is_some())
    }

    /// Bind `texture` to pin `index`, returning the previous binding.
    ///
    /// Panics on an out-of-range index or a null texture.
    pub fn bind(&mut self, owner: &str, index: usize, texture: TextureHandle) -> Option<TextureHandle> {
        if texture.is_null() {
            crate::engine_fatal!(owner, "Null texture bound to {} pin {}", self.direction.label(), index);
        }
        let pin = self.checked_mut(owner, index);
        pin.texture.replace(texture)
    }

    /// Clear pin `index`. Panics on an out-of-range index.
    pub fn unbind(&mut self, owner: &str, index: usize) -> Option<TextureHandle> {
        self.checked_mut(owner, index).texture.take()
    }

    /// Texture bound to pin `index`; panics if the pin is unbound
    pub fn require(&self, owner: &str, index: usize) -> TextureHandle {
        match self.pins.get(index) {
            Some(Pin { texture: Some(texture), .. }) => *texture,
            Some(pin) => crate::engine_fatal!(
                owner,
                "Required {} pin {} ('{}') is not bound",
                self.direction.label(),
                index,
                pin.name
            ),
            None => self.out_of_range(owner, index),
        }
    }

    fn checked_mut(&mut self, owner: &str, index: usize) -> &mut Pin {
        if index >= self.pins.len() {
            self.out_of_range(owner, index);
        }
        &mut self.pins[index]
    }

    fn out_of_range(&self, owner: &str, index: usize) -> ! {
        crate::engine_fatal!(
            owner,
            "{} pin {} out of range ({} pins)",
            self.direction.label(),
            index,
            self.pins.len()
        )
    }
}

#[cfg(test)]
#[path = "pin_tests.rs"]
mod tests;
