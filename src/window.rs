//! SDL2 presentation and input for the demo, plus PNG screenshots.

use std::path::Path;

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;

use crate::error::RenderError;
use crate::render::frame::FrameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Quit,
    Resize(u32, u32),
    /// Keys 1-5: shadow grid stride in pixels.
    SetShadowStride(usize),
    CycleDebugView,
    TogglePool,
    Screenshot,
}

fn key_event(keycode: Keycode) -> Option<WindowEvent> {
    let event = match keycode {
        Keycode::Escape => WindowEvent::Quit,
        Keycode::Num1 => WindowEvent::SetShadowStride(1),
        Keycode::Num2 => WindowEvent::SetShadowStride(2),
        Keycode::Num3 => WindowEvent::SetShadowStride(3),
        Keycode::Num4 => WindowEvent::SetShadowStride(4),
        Keycode::Num5 => WindowEvent::SetShadowStride(5),
        Keycode::V => WindowEvent::CycleDebugView,
        Keycode::P => WindowEvent::TogglePool,
        Keycode::F12 => WindowEvent::Screenshot,
        _ => return None,
    };
    Some(event)
}

pub struct Window {
    canvas: sdl2::render::Canvas<sdl2::video::Window>,
    // Declared before `texture_creator` so it is dropped first.
    texture: sdl2::render::Texture<'static>,
    texture_creator: Box<sdl2::render::TextureCreator<sdl2::video::WindowContext>>,
    event_pump: sdl2::EventPump,
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        let texture_creator = Box::new(canvas.texture_creator());
        let event_pump = sdl_context.event_pump()?;

        // SAFETY: texture_creator is heap-allocated and lives as long as Window.
        // The texture is dropped before texture_creator by struct field order.
        let texture_creator_ref: &'static sdl2::render::TextureCreator<sdl2::video::WindowContext> =
            unsafe { &*(texture_creator.as_ref() as *const _) };
        let texture = texture_creator_ref
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            canvas,
            texture,
            texture_creator,
            event_pump,
            width,
            height,
        })
    }

    /// Drains pending SDL events.
    pub fn poll_events(&mut self) -> Vec<WindowEvent> {
        let mut events = Vec::new();
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(WindowEvent::Quit),
                Event::KeyDown {
                    keycode: Some(keycode),
                    repeat: false,
                    ..
                } => events.extend(key_event(keycode)),
                Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(w, h),
                    ..
                } => events.push(WindowEvent::Resize(w.max(1) as u32, h.max(1) as u32)),
                _ => {}
            }
        }
        events
    }

    /// Uploads an ARGB8888 buffer of the window's size and shows it.
    pub fn present(&mut self, buffer: &[u8]) -> Result<(), String> {
        self.texture
            .update(None, buffer, (self.width * 4) as usize)
            .map_err(|e| e.to_string())?;

        self.canvas.clear();
        self.canvas
            .copy(&self.texture, None, Some(Rect::new(0, 0, self.width, self.height)))?;
        self.canvas.present();
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), String> {
        self.width = width;
        self.height = height;
        // SAFETY: Same as in new() - texture_creator outlives texture
        let texture_creator_ref: &'static sdl2::render::TextureCreator<sdl2::video::WindowContext> =
            unsafe { &*(self.texture_creator.as_ref() as *const _) };
        self.texture = texture_creator_ref
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), String> {
        self.canvas
            .window_mut()
            .set_title(title)
            .map_err(|e| e.to_string())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Writes the frame's color buffer as an RGBA PNG (format from the extension).
pub fn save_screenshot<P: AsRef<Path>>(frame: &FrameContext, path: P) -> Result<(), RenderError> {
    let (width, height) = (frame.width() as u32, frame.height() as u32);
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        let [b, g, r, a] = frame.color()[(y * width + x) as usize].to_le_bytes();
        image::Rgba([r, g, b, a])
    });
    image.save(path.as_ref())?;
    log::info!("screenshot saved to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::light::DirectionalLight;

    #[test]
    fn digit_keys_select_stride() {
        assert_eq!(key_event(Keycode::Num3), Some(WindowEvent::SetShadowStride(3)));
        assert_eq!(key_event(Keycode::Escape), Some(WindowEvent::Quit));
        assert_eq!(key_event(Keycode::Q), None);
    }

    #[test]
    fn screenshot_round_trips_pixels() {
        let mut frame =
            FrameContext::new(3, 2, Camera::default(), DirectionalLight::default()).unwrap();
        frame.color_mut()[4] = 0xFF10_2030;
        let path = std::env::temp_dir().join(format!("shadeline-shot-{}.png", std::process::id()));

        save_screenshot(&frame, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1).0, [0x10, 0x20, 0x30, 0xFF]);
    }
}
