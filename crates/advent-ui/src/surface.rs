//! egui-backed render surface. The engine draws into a shared shape list that
//! the app hands to a foreground painter every frame.

use std::cell::RefCell;
use std::rc::Rc;

use advent_platform::{RenderSurface, Result, SurfaceHost, SurfaceRect};
use egui::{Color32, Pos2, Shape, Stroke};

#[derive(Debug, Default)]
struct CanvasState {
    rect: Option<SurfaceRect>,
    shapes: Vec<Shape>,
}

/// Shape list shared between the engine's surface and the app's painter.
#[derive(Debug, Clone, Default)]
pub struct SharedCanvas(Rc<RefCell<CanvasState>>);

impl SharedCanvas {
    pub fn paint(&self, painter: &egui::Painter) {
        let state = self.0.borrow();
        if !state.shapes.is_empty() {
            painter.extend(state.shapes.iter().cloned());
        }
    }

    pub fn rect(&self) -> Option<SurfaceRect> {
        self.0.borrow().rect
    }
}

pub struct EguiSurface {
    canvas: SharedCanvas,
}

impl RenderSurface for EguiSurface {
    fn resize(&mut self, rect: SurfaceRect) -> Result<()> {
        // egui paints in points; pixels_per_point already carries the scale factor.
        self.canvas.0.borrow_mut().rect = Some(rect);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.canvas.0.borrow_mut().shapes.clear();
        Ok(())
    }

    fn fill_convex(&mut self, points: &[[f32; 2]], rgba: [f32; 4]) -> Result<()> {
        let mut state = self.canvas.0.borrow_mut();
        let (ox, oy) = state.rect.map(|r| (r.x, r.y)).unwrap_or_default();
        let points = points
            .iter()
            .map(|[x, y]| Pos2::new(x + ox, y + oy))
            .collect();
        state
            .shapes
            .push(Shape::convex_polygon(points, to_color32(rgba), Stroke::NONE));
        Ok(())
    }
}

pub struct EguiSurfaceHost {
    canvas: SharedCanvas,
}

impl EguiSurfaceHost {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }
}

impl SurfaceHost for EguiSurfaceHost {
    fn create_surface(&mut self, area: SurfaceRect) -> Result<Box<dyn RenderSurface>> {
        if area.width <= 0.0 || area.height <= 0.0 {
            return Err(format!("empty target area {}x{}", area.width, area.height).into());
        }
        let mut surface = EguiSurface {
            canvas: self.canvas.clone(),
        };
        surface.resize(area)?;
        Ok(Box::new(surface))
    }
}

fn to_color32(rgba: [f32; 4]) -> Color32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}
