//! Layer visibility flags and change notification.
//!
//! The renderer only ever sees the read-only [`LayerView`]; the host owns the
//! [`LayerConfiguration`], flips flags in response to input and subscribes to changes to
//! request redraws.

use std::cell::{Cell, RefCell};

/// Which visibility flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    PrimaryBody,
    Clouds,
}

/// Read-only access to the layer flags.
pub trait LayerView {
    fn show_primary_body_texture(&self) -> bool;

    fn show_cloud_texture(&self) -> bool;
}

type Listener = Box<dyn Fn(Layer, bool)>;

pub struct LayerConfiguration {
    show_primary_body_texture: Cell<bool>,
    show_cloud_texture: Cell<bool>,
    listeners: RefCell<Vec<Listener>>,
}

impl LayerConfiguration {
    pub fn new() -> Self {
        Self {
            show_primary_body_texture: Cell::new(true),
            show_cloud_texture: Cell::new(true),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Registers a callback invoked after every flag write, with the new value.
    pub fn subscribe(&self, listener: impl Fn(Layer, bool) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn set_show_primary_body_texture(&self, show: bool) {
        self.show_primary_body_texture.set(show);
        self.notify(Layer::PrimaryBody, show);
    }

    pub fn set_show_cloud_texture(&self, show: bool) {
        self.show_cloud_texture.set(show);
        self.notify(Layer::Clouds, show);
    }

    pub fn toggle(&self, layer: Layer) -> bool {
        match layer {
            Layer::PrimaryBody => {
                let show = !self.show_primary_body_texture.get();
                self.set_show_primary_body_texture(show);
                show
            }
            Layer::Clouds => {
                let show = !self.show_cloud_texture.get();
                self.set_show_cloud_texture(show);
                show
            }
        }
    }

    fn notify(&self, layer: Layer, show: bool) {
        log::debug!("Layer {:?} set to {}", layer, show);
        for listener in self.listeners.borrow().iter() {
            listener(layer, show);
        }
    }
}

impl Default for LayerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerView for LayerConfiguration {
    fn show_primary_body_texture(&self) -> bool {
        self.show_primary_body_texture.get()
    }

    fn show_cloud_texture(&self) -> bool {
        self.show_cloud_texture.get()
    }
}
