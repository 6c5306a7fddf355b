use anyhow::{Context, Result};
use image::RgbaImage;
use log::info;
use minimp4::Mp4Muxer;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::YUVBuffer;
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

/// Where composed frames end up.
pub trait Presenter {
    fn present(&mut self, frame: &RgbaImage) -> Result<()>;

    /// Flushes anything buffered. Called once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn frames_presented(&self) -> u64;
}

/// Discards frames; used when only the terminal session is watched.
#[derive(Debug, Default)]
pub struct NullPresenter {
    frames: u64,
}

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: &RgbaImage) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn frames_presented(&self) -> u64 {
        self.frames
    }
}

/// Writes each frame as `frame_<n>.png` into a directory.
pub struct PngSequencePresenter {
    dir: PathBuf,
    frames: u64,
}

impl PngSequencePresenter {
    pub fn create<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create frame directory: {}", dir.display()))?;
        info!("Writing frames to {}", dir.display());
        Ok(PngSequencePresenter { dir, frames: 0 })
    }
}

impl Presenter for PngSequencePresenter {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.frames));
        frame
            .save(&path)
            .with_context(|| format!("Failed to write frame {}", path.display()))?;
        self.frames += 1;
        Ok(())
    }

    fn frames_presented(&self) -> u64 {
        self.frames
    }
}

/// Encodes frames to H.264 and writes an MP4 file on `finish`.
pub struct Mp4Presenter {
    output: PathBuf,
    encoder: Encoder,
    h264_data: Vec<u8>,
    width: u32,
    height: u32,
    frames: u64,
    description: String,
}

impl Mp4Presenter {
    pub fn create<P: Into<PathBuf>>(output: P, width: u32, height: u32, fps: u32, description: String) -> Result<Self> {
        if width % 2 != 0 || height % 2 != 0 {
            anyhow::bail!("MP4 output needs even frame dimensions, got {}x{}", width, height);
        }
        let encoder = Encoder::with_api_config(
            openh264::OpenH264API::from_source(),
            EncoderConfig::new()
                .max_frame_rate(FrameRate::from_hz(fps as f32))
                .bitrate(BitRate::from_bps(5_000_000)), // 5 Mbps
        )
        .context("Failed to initialize H.264 encoder")?;
        let output = output.into();
        info!("Encoding {}x{} video at {} fps to {}", width, height, fps, output.display());
        Ok(Mp4Presenter {
            output,
            encoder,
            h264_data: Vec::new(),
            width,
            height,
            frames: 0,
            description,
        })
    }
}

impl Presenter for Mp4Presenter {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            anyhow::bail!(
                "Frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }
        let yuv_data = rgb_to_yuv420(frame);
        let yuv_source = YUVBuffer::from_vec(yuv_data, self.width as usize, self.height as usize);
        let bitstream = self
            .encoder
            .encode(&yuv_source)
            .map_err(|e| anyhow::anyhow!("Failed to encode frame {}: {}", self.frames, e))?;
        bitstream.write_vec(&mut self.h264_data);
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        info!("Creating MP4 file...");
        let mut video_buffer = Cursor::new(Vec::new());
        let mut mp4muxer = Mp4Muxer::new(&mut video_buffer);
        mp4muxer.init_video(self.width as i32, self.height as i32, false, &self.description);
        mp4muxer.write_video(&self.h264_data);
        mp4muxer.close();

        video_buffer.seek(SeekFrom::Start(0))?;
        let mut video_bytes = Vec::new();
        video_buffer.read_to_end(&mut video_bytes)?;
        fs::write(&self.output, &video_bytes)
            .with_context(|| format!("Failed to write video file to {}", self.output.display()))?;
        info!("Saved {} frames to {}", self.frames, self.output.display());
        Ok(())
    }

    fn frames_presented(&self) -> u64 {
        self.frames
    }
}

fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// BT.601 RGB to planar YUV 4:2:0. Chroma is the mean over each 2x2 block,
/// clipped at odd right and bottom edges.
pub fn rgb_to_yuv420(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    if width == 0 || image.height() == 0 {
        return Vec::new();
    }
    let chroma_width = width.div_ceil(2);
    let rows: Vec<&[u8]> = image.as_raw().chunks_exact(width * 4).collect();
    let chroma_len = chroma_width * rows.len().div_ceil(2);

    let mut yuv: Vec<u8> = image
        .as_raw()
        .chunks_exact(4)
        .map(|p| luma(p[0] as f32, p[1] as f32, p[2] as f32).round() as u8)
        .collect();
    let mut u_plane = Vec::with_capacity(chroma_len);
    let mut v_plane = Vec::with_capacity(chroma_len);

    for row_pair in rows.chunks(2) {
        for block_x in 0..chroma_width {
            let (mut sum_u, mut sum_v, mut count) = (0f32, 0f32, 0f32);
            for row in row_pair {
                for p in row[block_x * 8..(block_x * 8 + 8).min(row.len())].chunks_exact(4) {
                    let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
                    sum_u += -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                    sum_v += 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
                    count += 1.0;
                }
            }
            u_plane.push((sum_u / count).round() as u8);
            v_plane.push((sum_v / count).round() as u8);
        }
    }

    yuv.extend(u_plane);
    yuv.extend(v_plane);
    yuv
}
