use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::f32::consts::PI;
use std::path::Path;
use crate::{field::VelocityField, Float};

/// Arrow head edge length in pixels.
const ARROW_HEAD: Float = 4.0;
/// White arrows are blended over the heatmap at this opacity.
const ARROW_OPACITY: Float = 0.3;

/// Map a speed onto the cyan-to-purple display ramp.
pub fn velocity_to_color(magnitude: Float, max_magnitude: Float) -> [u8; 3] {
    let normalized = if magnitude.is_finite() {
        (magnitude / max_magnitude).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let r = (normalized * 150.0).floor() as u8;
    let g = (200.0 - normalized * 100.0).floor() as u8;
    let b = (255.0 - normalized * 55.0).floor() as u8;
    [r, g, b]
}

/// Writes legacy ASCII VTK snapshots of the cavity and tracks them for a
/// ParaView collection file.
#[derive(Debug, Default)]
pub struct VTKWriter {
    frames: Vec<(f64, String)>, // (simulated time, file name without directory)
}

impl VTKWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, filename: &str, field: &VelocityField, step: u64, time: f64) -> Result<()> {
        let nx = field.nx();
        let ny = field.ny();
        let file = File::create(filename).with_context(|| format!("creating {filename}"))?;
        let mut file = BufWriter::new(file);

        let basename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename);
        self.frames.push((time, basename.to_string()));

        writeln!(file, "# vtk DataFile Version 3.0")?;
        writeln!(file, "Lid-driven cavity - Step {} Time {:.4}", step, time)?;
        writeln!(file, "ASCII")?;
        writeln!(file, "DATASET STRUCTURED_POINTS")?;
        writeln!(file, "DIMENSIONS {} {} 1", nx, ny)?;
        writeln!(file, "ORIGIN 0 0 0")?;
        writeln!(file, "SPACING {} {} 1", 1.0 / nx as Float, 1.0 / ny as Float)?;

        writeln!(file, "POINT_DATA {}", field.len())?;

        writeln!(file, "VECTORS Velocity float")?;
        for (u, v) in field.u().iter().zip(field.v()) {
            writeln!(file, "{:.6} {:.6} 0.0", u, v)?;
        }

        writeln!(file, "SCALARS VelocityMagnitude float")?;
        writeln!(file, "LOOKUP_TABLE default")?;
        for magnitude in field.magnitudes() {
            writeln!(file, "{:.6}", magnitude)?;
        }

        writeln!(file, "SCALARS Vorticity float")?;
        writeln!(file, "LOOKUP_TABLE default")?;
        for w in field.vorticity() {
            writeln!(file, "{:.6}", w)?;
        }

        file.flush()?;
        Ok(())
    }

    /// Write a ParaView `.pvd` collection indexing every frame written so far by time.
    pub fn write_collection(&self, collection_filename: &str) -> Result<()> {
        let datasets: String = self
            .frames
            .iter()
            .map(|(time, name)| {
                format!("    <DataSet timestep=\"{time:.6}\" part=\"0\" file=\"{name}\"/>\n")
            })
            .collect();

        let mut file = BufWriter::new(
            File::create(collection_filename)
                .with_context(|| format!("creating {collection_filename}"))?,
        );
        write!(
            file,
            "<?xml version=\"1.0\"?>\n<VTKFile type=\"Collection\" version=\"0.1\">\n  <Collection>\n{datasets}  </Collection>\n</VTKFile>\n"
        )?;
        file.flush()?;
        Ok(())
    }

    pub fn file_count(&self) -> usize {
        self.frames.len()
    }
}

/// Render the speed field as RGB pixels, `scale` pixels per cell, lid row on top.
/// With `draw_vectors` a sparse grid of velocity arrows is drawn over the heatmap.
pub fn render_rgb(field: &VelocityField, scale: usize, draw_vectors: bool) -> (usize, usize, Vec<u8>) {
    let width = field.nx() * scale;
    let height = field.ny() * scale;
    let max_magnitude = field.max_magnitude();
    let mut pixels = Vec::with_capacity(width * height * 3);

    for py in 0..height {
        let j = (height - py - 1) / scale;
        for px in 0..width {
            let i = px / scale;
            pixels.extend_from_slice(&velocity_to_color(field.magnitude(i, j), max_magnitude));
        }
    }

    if draw_vectors {
        let mut canvas = Canvas { pixels: &mut pixels, width, height };
        draw_arrows(&mut canvas, field, scale);
    }

    (width, height, pixels)
}

/// Arrows on every `max(2, nx / 20)`-th interior cell, `0.8` of the sampling
/// spacing long at unit speed. Arrows shorter than half a pixel are skipped.
fn draw_arrows(canvas: &mut Canvas<'_>, field: &VelocityField, scale: usize) {
    let (nx, ny) = (field.nx(), field.ny());
    let cell = scale as Float;
    let stride = (nx / 20).max(2);
    let length = cell * stride as Float * 0.8;
    let height = canvas.height as Float;

    for j in (stride..ny.saturating_sub(stride)).step_by(stride) {
        for i in (stride..nx.saturating_sub(stride)).step_by(stride) {
            let [u, v] = field.velocity(i, j);
            let (vx, vy) = (u * length, -v * length);
            let magnitude = (vx * vx + vy * vy).sqrt();
            if !(magnitude > 0.5 && magnitude.is_finite()) {
                continue;
            }

            let x = (i as Float + 0.5) * cell;
            let y = height - (j as Float + 0.5) * cell;
            let (tip_x, tip_y) = (x + vx, y + vy);
            canvas.line(x, y, tip_x, tip_y);

            let angle = vy.atan2(vx);
            for side in [-1.0, 1.0] {
                let barb = angle + side * PI / 6.0;
                canvas.line(
                    tip_x,
                    tip_y,
                    tip_x - ARROW_HEAD * barb.cos(),
                    tip_y - ARROW_HEAD * barb.sin(),
                );
            }
        }
    }
}

struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: usize,
    height: usize,
}

impl Canvas<'_> {
    /// Bresenham line between pixel positions. Endpoints are pulled into a band
    /// around the image so runaway velocities cannot produce huge loops.
    fn line(&mut self, x0: Float, y0: Float, x1: Float, y1: Float) {
        let (w, h) = (self.width as Float, self.height as Float);
        let snap = |p: Float, extent: Float| p.clamp(-extent, 2.0 * extent).floor() as i64;
        let (mut x, mut y) = (snap(x0, w), snap(y0, h));
        let (x1, y1) = (snap(x1, w), snap(y1, h));

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn blend(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let offset = (y as usize * self.width + x as usize) * 3;
        for channel in &mut self.pixels[offset..offset + 3] {
            let mixed = *channel as Float * (1.0 - ARROW_OPACITY) + 255.0 * ARROW_OPACITY;
            *channel = mixed.round() as u8;
        }
    }
}

/// Write a binary PPM (P6) heatmap of the speed field.
pub fn write_ppm(filename: &str, field: &VelocityField, scale: usize, draw_vectors: bool) -> Result<()> {
    let (width, height, pixels) = render_rgb(field, scale, draw_vectors);
    let file = File::create(filename).with_context(|| format!("creating {filename}"))?;
    let mut file = BufWriter::new(file);

    write!(file, "P6\n{} {}\n255\n", width, height)?;
    file.write_all(&pixels)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_ramp_endpoints() {
        assert_eq!(velocity_to_color(0.0, 1.0), [0, 200, 255]);
        assert_eq!(velocity_to_color(1.0, 1.0), [150, 100, 200]);
        assert_eq!(velocity_to_color(3.0, 1.0), [150, 100, 200]);
        assert_eq!(velocity_to_color(Float::NAN, 1.0), [150, 100, 200]);
    }

    #[test]
    fn rendered_image_puts_lid_on_top() {
        let field = VelocityField::create(4, 4).unwrap();
        let (width, height, pixels) = render_rgb(&field, 2, true);
        assert_eq!((width, height), (8, 8));
        assert_eq!(pixels.len(), 8 * 8 * 3);

        // First pixel row is the lid, last is the resting bottom wall.
        assert_eq!(&pixels[0..3], &[150, 100, 200]);
        let last_row = (height - 1) * width * 3;
        assert_eq!(&pixels[last_row..last_row + 3], &[0, 200, 255]);
    }

    #[test]
    fn vtk_files_and_collection_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let field = VelocityField::create(5, 5).unwrap();
        let mut writer = VTKWriter::new();

        let first = dir.path().join("output_000000.vtk");
        let second = dir.path().join("output_000010.vtk");
        writer.write(first.to_str().unwrap(), &field, 0, 0.0).unwrap();
        writer.write(second.to_str().unwrap(), &field, 10, 0.05).unwrap();
        assert_eq!(writer.file_count(), 2);

        let body = std::fs::read_to_string(&first).unwrap();
        assert!(body.contains("DIMENSIONS 5 5 1"));
        assert!(body.contains("POINT_DATA 25"));
        assert!(body.contains("SCALARS Vorticity float"));

        let pvd = dir.path().join("cavity.pvd");
        writer.write_collection(pvd.to_str().unwrap()).unwrap();
        let collection = std::fs::read_to_string(&pvd).unwrap();
        assert!(collection.contains("file=\"output_000010.vtk\""));
        assert!(collection.contains("timestep=\"0.050000\""));
    }

    #[test]
    fn ppm_has_header_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        let field = VelocityField::create(3, 3).unwrap();
        write_ppm(path.to_str().unwrap(), &field, 1, true).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = b"P6\n3 3\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 27);
    }

    #[test]
    fn arrows_are_drawn_where_the_flow_moves() {
        let n = 20;
        let mut u = VelocityField::create(n, n).unwrap().u().to_vec();
        for i in 1..n - 1 {
            u[16 * n + i] = 0.5;
        }
        let field = VelocityField::from_components(n, n, u, vec![0.0; n * n]);

        let (width, height, plain) = render_rgb(&field, 4, false);
        let (_, _, arrows) = render_rgb(&field, 4, true);
        let pixel = |buf: &[u8], x: usize, y: usize| {
            let offset = (y * width + x) * 3;
            [buf[offset], buf[offset + 1], buf[offset + 2]]
        };

        // Cell (2, 16) centre sits at pixel (10, 14); the shaft runs right to x = 13.
        for x in 10..=13 {
            let before = pixel(&plain, x, 14);
            let after = pixel(&arrows, x, 14);
            assert_ne!(before, after, "shaft pixel ({x}, 14)");
            assert!(after.iter().zip(before).all(|(a, b)| *a >= b));
        }
        assert_eq!(pixel(&plain, 8, 14), pixel(&arrows, 8, 14));

        // Resting rows further down stay untouched.
        let lower = 20 * width * 3;
        assert_eq!(&plain[lower..], &arrows[lower..]);
        assert_eq!(plain.len(), width * height * 3);
    }

    #[test]
    fn resting_field_gets_no_arrows() {
        let field = VelocityField::create(40, 40).unwrap();
        let (_, _, plain) = render_rgb(&field, 2, false);
        let (_, _, arrows) = render_rgb(&field, 2, true);
        assert_eq!(plain, arrows);
    }
}
