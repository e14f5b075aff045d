//! Vector drawing, graphics states, layers, and shadings.
//!
//! [`Drawing`] is a chainable pen over the path primitives: set colors,
//! build a path, paint it. The engine enters path scope with the first
//! path operator and leaves it with the paint operator, so every built
//! path must be painted before other page output.

use crate::adapter::Adapter;
use crate::color::{Color, PaintMode};
use crate::error::Result;
use crate::handle::{HandleRef, Handleable};
use crate::options::{OptionList, OptionValue};

/// A drawing pen bound to the current page.
#[derive(Debug, Clone)]
pub struct Drawing {
    adapter: Adapter,
}

impl Drawing {
    pub(crate) fn new(adapter: &Adapter) -> Self {
        Self {
            adapter: adapter.clone(),
        }
    }

    /// Set the stroke color and line width.
    pub fn stroke(&self, color: &Color, width: f64) -> Result<&Self> {
        self.adapter.set_color(PaintMode::Stroke, color)?;
        self.adapter.set_line_width(width)?;
        Ok(self)
    }

    /// Set the fill color.
    pub fn fill(&self, color: &Color) -> Result<&Self> {
        self.adapter.set_color(PaintMode::Fill, color)?;
        Ok(self)
    }

    /// Set the fill and stroke colors at once.
    pub fn fill_and_stroke(&self, color: &Color) -> Result<&Self> {
        self.adapter.set_color(PaintMode::FillStroke, color)?;
        Ok(self)
    }

    /// Start a new subpath at the given point.
    pub fn move_to(&self, x: f64, y: f64) -> Result<&Self> {
        self.adapter.move_to(x, y)?;
        Ok(self)
    }

    /// Extend the current subpath with a straight line.
    pub fn line_to(&self, x: f64, y: f64) -> Result<&Self> {
        self.adapter.line_to(x, y)?;
        Ok(self)
    }

    /// Add a circle around `(x, y)` to the path.
    pub fn circle(&self, x: f64, y: f64, radius: f64) -> Result<&Self> {
        self.adapter.circle(x, y, radius)?;
        Ok(self)
    }

    /// Add a rectangle with lower-left corner `(x, y)` to the path.
    pub fn rectangle(&self, x: f64, y: f64, width: f64, height: f64) -> Result<&Self> {
        self.adapter.rect(x, y, width, height)?;
        Ok(self)
    }

    /// Paint the path with fill and stroke.
    pub fn paint(&self) -> Result<&Self> {
        self.adapter.fill_stroke()?;
        Ok(self)
    }

    /// Paint only the stroke.
    pub fn paint_stroke(&self) -> Result<&Self> {
        self.adapter.stroke()?;
        Ok(self)
    }

    /// Paint only the fill.
    pub fn paint_fill(&self) -> Result<&Self> {
        self.adapter.fill()?;
        Ok(self)
    }
}

/// An explicit graphics state object (opacity, blend mode, and friends).
#[derive(Debug)]
pub struct GraphicsState {
    adapter: Adapter,
    handle: HandleRef,
}

impl GraphicsState {
    pub(crate) fn create(adapter: &Adapter, options: OptionList) -> Result<Self> {
        let handle = adapter.create_graphics_state(options)?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
        })
    }

    /// Save the current state and switch to this one.
    pub fn apply(&self) -> Result<()> {
        self.adapter.save()?;
        self.adapter.set_graphics_state(self)
    }

    /// Return to the state saved by [`GraphicsState::apply`].
    pub fn restore(&self) -> Result<()> {
        self.adapter.restore()
    }
}

impl Handleable for GraphicsState {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

/// Viewer-side relationship kinds between optional-content layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerDependency {
    /// Visible only when all layers in the group are on.
    GroupAllOn,
    /// Visible when any layer in the group is on.
    GroupAnyOn,
    /// Visible only when all layers in the group are off.
    GroupAllOff,
    /// Visible when any layer in the group is off.
    GroupAnyOff,
    /// The layers in the group cannot be toggled by the user.
    Lock,
    /// Nest the group under a parent layer in the viewer panel.
    Parent,
    /// At most one layer of the group is visible at a time.
    Radiobtn,
    /// The parent entry is a title with no layer of its own.
    Title,
}

impl LayerDependency {
    /// The engine keyword for this relationship.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerDependency::GroupAllOn => "GroupAllOn",
            LayerDependency::GroupAnyOn => "GroupAnyOn",
            LayerDependency::GroupAllOff => "GroupAllOff",
            LayerDependency::GroupAnyOff => "GroupAnyOff",
            LayerDependency::Lock => "Lock",
            LayerDependency::Parent => "Parent",
            LayerDependency::Radiobtn => "Radiobtn",
            LayerDependency::Title => "Title",
        }
    }
}

/// An optional-content layer that page output can be routed into.
#[derive(Debug)]
pub struct Layer {
    adapter: Adapter,
    handle: HandleRef,
    name: String,
}

impl Layer {
    pub(crate) fn define(adapter: &Adapter, name: &str, options: OptionList) -> Result<Self> {
        let handle = adapter.define_layer(name, options)?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
            name: name.to_owned(),
        })
    }

    /// The layer name shown in the viewer panel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route subsequent page output into this layer.
    pub fn begin(&self) -> Result<()> {
        self.adapter.begin_layer(self)
    }

    /// Deactivate all active layers.
    pub fn end(&self) -> Result<()> {
        self.adapter.end_layer()
    }
}

impl Handleable for Layer {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

/// Geometry kinds for smooth color transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingKind {
    /// Linear transition along the axis from start to end point.
    Axial,
    /// Circular transition between two circles around the given points.
    Radial,
}

impl ShadingKind {
    /// The engine keyword for this geometry.
    pub fn as_str(self) -> &'static str {
        match self {
            ShadingKind::Axial => "axial",
            ShadingKind::Radial => "radial",
        }
    }
}

/// A smooth color transition filling paths or areas.
#[derive(Debug)]
pub struct Shading {
    adapter: Adapter,
    handle: HandleRef,
}

impl Shading {
    /// Define a shading running from `(x0, y0)` to `(x1, y1)`.
    ///
    /// Start and end colors ride in the option list; the engine's legacy
    /// positional color components stay zeroed.
    pub(crate) fn create(
        adapter: &Adapter,
        kind: ShadingKind,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        start: &Color,
        end: &Color,
        options: OptionList,
    ) -> Result<Self> {
        let options = options
            .with("startcolor", start.clone())
            .with("endcolor", end.clone());
        let handle = adapter.shading(kind.as_str(), x0, y0, x1, y1, [0.0; 4], options)?;
        Ok(Self {
            adapter: adapter.clone(),
            handle,
        })
    }

    /// Build a `stopcolors` option value from intermediate stops.
    ///
    /// Each stop pairs an offset in `0.0..=1.0` with the color reached
    /// there. Pass the result as an extra option when the transition
    /// needs more than the two endpoint colors:
    ///
    /// ```
    /// use enpdf::color::Color;
    /// use enpdf::draw::Shading;
    /// use enpdf::options::OptionList;
    ///
    /// let stops = Shading::stops(&[(0.5, Color::rgb(255, 0, 0))]);
    /// let options = OptionList::new().with("stopcolors", stops);
    /// assert_eq!(options.encode(), "stopcolors={0.5 {rgb 1 0 0}}");
    /// ```
    pub fn stops(stops: &[(f64, Color)]) -> OptionValue {
        let mut items = Vec::with_capacity(stops.len() * 2);
        for (offset, color) in stops {
            items.push(OptionValue::Number(*offset));
            items.push(OptionValue::Color(color.clone()));
        }
        OptionValue::List(items)
    }

    /// Fill the current clip area with this shading.
    pub fn fill(&self) -> Result<()> {
        self.adapter.shading_fill(self)
    }
}

impl Handleable for Shading {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}
