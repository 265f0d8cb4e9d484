use std::ops::{Add, Sub};

/// A client-space point. Reused in place for the lifetime of a drag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn set(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn set_from(&mut self, pointer: &PointerSample) -> &mut Self {
        self.set(pointer.client.x, pointer.client.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Self) -> Self::Output {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Self) -> Self::Output {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A bounding client rect, the same shape `getBoundingClientRect` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn translated(&self, by: Vec2) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }
}

/// Window measurements needed to keep the floating layer on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    /// `window.innerWidth`, scrollbar included.
    pub inner_width: f64,
    /// `document.documentElement.clientWidth`, scrollbar excluded.
    pub client_width: f64,
}

impl Viewport {
    pub fn scrollbar_width(&self) -> f64 {
        self.inner_width - self.client_width
    }

    pub fn usable_width(&self) -> f64 {
        self.inner_width - self.scrollbar_width()
    }
}

/// Host agnostic form of a mouse event: where the pointer is and which buttons are held.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerSample {
    pub client: Vec2,
    pub buttons: u16,
}

impl PointerSample {
    pub const fn new(x: f64, y: f64, buttons: u16) -> Self {
        Self {
            client: Vec2::new(x, y),
            buttons,
        }
    }
}

/// Unlike `f64::clamp` this never panics: when `min > max`, `max` wins.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
