// PIXEL CONVERT - decoder output to packed RGBA
//
// Decoders hand back YUV (planar or semi-planar) or packed RGB.
// Callers always receive packed RGBA, 4 bytes per pixel, stride = width * 4.
// Integer lookup tables keep the hot loop free of float math.

use serde::{Deserialize, Serialize};

use super::ConvertError;
use crate::backend::RawPicture;

// ============================================================================
// Pixel Formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    YUV420P,      // Y plane, U plane (quarter size), V plane (quarter size)
    NV12,         // Y plane, interleaved UV plane
    RGB24,        // 8-bit per channel, packed
    RGBA32,       // 8-bit per channel + alpha, packed
    BGRA32,       // Windows format with alpha
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, 0 for planar
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RGB24 => 3,
            Self::RGBA32 | Self::BGRA32 => 4,
            _ => 0,
        }
    }

    /// Minimum stride of each plane for a picture `width` pixels wide.
    pub fn plane_widths(&self, width: usize) -> Vec<usize> {
        let chroma = (width + 1) / 2;
        match self {
            Self::YUV420P => vec![width, chroma, chroma],
            Self::NV12 => vec![width, chroma * 2],
            _ => vec![width * self.bytes_per_pixel()],
        }
    }

    /// Rows in each plane for a picture `height` pixels tall.
    pub fn plane_heights(&self, height: usize) -> Vec<usize> {
        let chroma = (height + 1) / 2;
        match self {
            Self::YUV420P => vec![height, chroma, chroma],
            Self::NV12 => vec![height, chroma],
            _ => vec![height],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "yuv420p" => Some(Self::YUV420P),
            "nv12" => Some(Self::NV12),
            "rgb24" => Some(Self::RGB24),
            "rgba" => Some(Self::RGBA32),
            "bgra" => Some(Self::BGRA32),
            _ => None,
        }
    }
}

/// Size in bytes of a packed RGBA buffer.
pub fn rgba_buffer_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

// ============================================================================
// Color Spaces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    BT601,    // SD (NTSC/PAL)
    #[default]
    BT709,    // HD
    BT2020,   // UHD/HDR
}

impl ColorSpace {
    /// Returns (Wr, Wb) where Wg = 1 - Wr - Wb
    pub fn coefficients(&self) -> (f32, f32) {
        match self {
            Self::BT601 => (0.299, 0.114),
            Self::BT709 => (0.2126, 0.0722),
            Self::BT2020 => (0.2627, 0.0593),
        }
    }

    /// Full YUV to RGB matrix
    pub fn yuv_to_rgb_matrix(&self) -> [[f32; 3]; 3] {
        let (wr, wb) = self.coefficients();
        let wg = 1.0 - wr - wb;

        // R = Y + 2*(1-Wr)*Cr
        // G = Y - 2*Wb*(1-Wb)/Wg*Cb - 2*Wr*(1-Wr)/Wg*Cr
        // B = Y + 2*(1-Wb)*Cb
        let cr_r = 2.0 * (1.0 - wr);
        let cb_g = -2.0 * wb * (1.0 - wb) / wg;
        let cr_g = -2.0 * wr * (1.0 - wr) / wg;
        let cb_b = 2.0 * (1.0 - wb);

        [
            [1.0, 0.0, cr_r],
            [1.0, cb_g, cr_g],
            [1.0, cb_b, 0.0],
        ]
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Converts pictures of one fixed size and source format to RGBA.
pub struct PixelConverter {
    src_format: PixelFormat,
    width: usize,
    height: usize,
    color_space: ColorSpace,
    // Fixed point, 8 fractional bits
    y_table: [i32; 256],
    u_table_g: [i32; 256],
    u_table_b: [i32; 256],
    v_table_r: [i32; 256],
    v_table_g: [i32; 256],
}

impl PixelConverter {
    pub fn new(
        src_format: PixelFormat,
        width: u32,
        height: u32,
        color_space: ColorSpace,
    ) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::EmptyPicture);
        }

        let mut converter = Self {
            src_format,
            width: width as usize,
            height: height as usize,
            color_space,
            y_table: [0; 256],
            u_table_g: [0; 256],
            u_table_b: [0; 256],
            v_table_r: [0; 256],
            v_table_g: [0; 256],
        };
        converter.build_tables();
        Ok(converter)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn build_tables(&mut self) {
        let matrix = self.color_space.yuv_to_rgb_matrix();
        // Limited range chroma spans 224 codes instead of 255
        let chroma_scale = 255.0 / 224.0;

        for i in 0..256 {
            let y = (i as i32) - 16;
            let uv = (i as f32) - 128.0;

            // 298/256 ≈ 255/219
            self.y_table[i] = y * 298;

            self.u_table_g[i] = (uv * chroma_scale * matrix[1][1] * 256.0) as i32;
            self.u_table_b[i] = (uv * chroma_scale * matrix[2][1] * 256.0) as i32;
            self.v_table_r[i] = (uv * chroma_scale * matrix[0][2] * 256.0) as i32;
            self.v_table_g[i] = (uv * chroma_scale * matrix[1][2] * 256.0) as i32;
        }
    }

    #[inline]
    fn yuv_to_rgba(&self, y: u8, u: u8, v: u8, out: &mut [u8]) {
        let y_contrib = self.y_table[y as usize];
        let (u, v) = (u as usize, v as usize);
        let r = (y_contrib + self.v_table_r[v]) >> 8;
        let g = (y_contrib + self.u_table_g[u] + self.v_table_g[v]) >> 8;
        let b = (y_contrib + self.u_table_b[u]) >> 8;
        out[0] = r.clamp(0, 255) as u8;
        out[1] = g.clamp(0, 255) as u8;
        out[2] = b.clamp(0, 255) as u8;
        out[3] = 255;
    }

    /// Convert `src` into `dst`, which must hold `width * height * 4` bytes.
    pub fn convert(&self, src: &RawPicture, dst: &mut [u8]) -> Result<(), ConvertError> {
        if src.format != self.src_format {
            return Err(ConvertError::FormatMismatch {
                expected: self.src_format,
                actual: src.format,
            });
        }
        if src.width as usize != self.width || src.height as usize != self.height {
            return Err(ConvertError::SizeMismatch {
                expected: (self.width as u32, self.height as u32),
                actual: (src.width, src.height),
            });
        }
        let needed = self.width * self.height * 4;
        if dst.len() < needed {
            return Err(ConvertError::ShortOutput {
                needed,
                have: dst.len(),
            });
        }
        self.check_planes(src)?;

        match self.src_format {
            PixelFormat::YUV420P => self.yuv420p_to_rgba(src, dst),
            PixelFormat::NV12 => self.nv12_to_rgba(src, dst),
            PixelFormat::RGB24 => self.rgb24_to_rgba(src, dst),
            PixelFormat::RGBA32 => self.copy_rgba(src, dst),
            PixelFormat::BGRA32 => self.bgra_to_rgba(src, dst),
        }
        Ok(())
    }

    fn check_planes(&self, src: &RawPicture) -> Result<(), ConvertError> {
        let widths = self.src_format.plane_widths(self.width);
        let heights = self.src_format.plane_heights(self.height);

        for (plane, (row_bytes, rows)) in widths.iter().zip(heights.iter()).enumerate() {
            let data = src.planes.get(plane).ok_or(ConvertError::MissingPlane(plane))?;
            let stride = src.strides.get(plane).copied().unwrap_or(*row_bytes);
            if stride < *row_bytes {
                return Err(ConvertError::BadStride {
                    plane,
                    stride,
                    min: *row_bytes,
                });
            }
            let needed = stride * (rows - 1) + row_bytes;
            if data.len() < needed {
                return Err(ConvertError::ShortPlane {
                    plane,
                    needed,
                    have: data.len(),
                });
            }
        }
        Ok(())
    }

    fn stride(&self, src: &RawPicture, plane: usize) -> usize {
        src.strides
            .get(plane)
            .copied()
            .unwrap_or_else(|| self.src_format.plane_widths(self.width)[plane])
    }

    fn yuv420p_to_rgba(&self, src: &RawPicture, rgba: &mut [u8]) {
        let (y_plane, u_plane, v_plane) = (&src.planes[0], &src.planes[1], &src.planes[2]);
        let (y_stride, u_stride, v_stride) =
            (self.stride(src, 0), self.stride(src, 1), self.stride(src, 2));

        for y in 0..self.height {
            let y_row = y * y_stride;
            let u_row = (y / 2) * u_stride;
            let v_row = (y / 2) * v_stride;
            let dst_row = y * self.width * 4;

            for x in 0..self.width {
                let dst_idx = dst_row + x * 4;
                self.yuv_to_rgba(
                    y_plane[y_row + x],
                    u_plane[u_row + x / 2],
                    v_plane[v_row + x / 2],
                    &mut rgba[dst_idx..dst_idx + 4],
                );
            }
        }
    }

    fn nv12_to_rgba(&self, src: &RawPicture, rgba: &mut [u8]) {
        let (y_plane, uv_plane) = (&src.planes[0], &src.planes[1]);
        let (y_stride, uv_stride) = (self.stride(src, 0), self.stride(src, 1));

        for y in 0..self.height {
            let y_row = y * y_stride;
            let uv_row = (y / 2) * uv_stride;
            let dst_row = y * self.width * 4;

            for x in 0..self.width {
                let uv_idx = uv_row + (x / 2) * 2;
                let dst_idx = dst_row + x * 4;
                self.yuv_to_rgba(
                    y_plane[y_row + x],
                    uv_plane[uv_idx],
                    uv_plane[uv_idx + 1],
                    &mut rgba[dst_idx..dst_idx + 4],
                );
            }
        }
    }

    fn rgb24_to_rgba(&self, src: &RawPicture, rgba: &mut [u8]) {
        let stride = self.stride(src, 0);
        for y in 0..self.height {
            let src_row = &src.planes[0][y * stride..y * stride + self.width * 3];
            let dst_row = &mut rgba[y * self.width * 4..(y + 1) * self.width * 4];
            for (px, out) in src_row.chunks_exact(3).zip(dst_row.chunks_exact_mut(4)) {
                out[..3].copy_from_slice(px);
                out[3] = 255;
            }
        }
    }

    fn copy_rgba(&self, src: &RawPicture, rgba: &mut [u8]) {
        let stride = self.stride(src, 0);
        let row_bytes = self.width * 4;
        for y in 0..self.height {
            rgba[y * row_bytes..(y + 1) * row_bytes]
                .copy_from_slice(&src.planes[0][y * stride..y * stride + row_bytes]);
        }
    }

    fn bgra_to_rgba(&self, src: &RawPicture, rgba: &mut [u8]) {
        let stride = self.stride(src, 0);
        let row_bytes = self.width * 4;
        for y in 0..self.height {
            let src_row = &src.planes[0][y * stride..y * stride + row_bytes];
            let dst_row = &mut rgba[y * row_bytes..(y + 1) * row_bytes];
            for (px, out) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4)) {
                out[0] = px[2];
                out[1] = px[1];
                out[2] = px[0];
                out[3] = px[3];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_yuv420p(width: u32, height: u32, luma: u8, stride_pad: usize) -> RawPicture {
        let w = width as usize;
        let h = height as usize;
        let cw = (w + 1) / 2;
        let ch = (h + 1) / 2;
        RawPicture {
            format: PixelFormat::YUV420P,
            width,
            height,
            planes: vec![
                vec![luma; (w + stride_pad) * h],
                vec![128; (cw + stride_pad) * ch],
                vec![128; (cw + stride_pad) * ch],
            ],
            strides: vec![w + stride_pad, cw + stride_pad, cw + stride_pad],
        }
    }

    #[test]
    fn test_gray_is_neutral() {
        let converter = PixelConverter::new(PixelFormat::YUV420P, 4, 2, ColorSpace::BT709).unwrap();
        let src = gray_yuv420p(4, 2, 126, 0);
        let mut dst = vec![0u8; rgba_buffer_size(4, 2)];
        converter.convert(&src, &mut dst).unwrap();

        for px in dst.chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }
        // (126 - 16) * 298 >> 8 = 128
        assert_eq!(dst[0], 128);
    }

    #[test]
    fn test_limited_range_extremes() {
        let converter = PixelConverter::new(PixelFormat::YUV420P, 2, 2, ColorSpace::BT601).unwrap();
        let mut dst = vec![0u8; 16];

        converter.convert(&gray_yuv420p(2, 2, 16, 0), &mut dst).unwrap();
        assert_eq!(&dst[..4], &[0, 0, 0, 255]);

        converter.convert(&gray_yuv420p(2, 2, 235, 0), &mut dst).unwrap();
        assert!(dst[0] >= 254);
    }

    #[test]
    fn test_padded_strides_and_odd_size() {
        let converter = PixelConverter::new(PixelFormat::YUV420P, 5, 3, ColorSpace::BT709).unwrap();
        let src = gray_yuv420p(5, 3, 200, 11);
        let mut dst = vec![0u8; rgba_buffer_size(5, 3)];
        converter.convert(&src, &mut dst).unwrap();
        let first = dst[0];
        assert!(dst.chunks_exact(4).all(|px| px[0] == first));
    }

    #[test]
    fn test_nv12_matches_yuv420p() {
        let yuv = PixelConverter::new(PixelFormat::YUV420P, 2, 2, ColorSpace::BT709).unwrap();
        let nv12 = PixelConverter::new(PixelFormat::NV12, 2, 2, ColorSpace::BT709).unwrap();

        let planar = RawPicture {
            format: PixelFormat::YUV420P,
            width: 2,
            height: 2,
            planes: vec![vec![81, 90, 100, 110], vec![90], vec![240]],
            strides: vec![2, 1, 1],
        };
        let semi = RawPicture {
            format: PixelFormat::NV12,
            width: 2,
            height: 2,
            planes: vec![vec![81, 90, 100, 110], vec![90, 240]],
            strides: vec![2, 2],
        };

        let mut a = vec![0u8; 16];
        let mut b = vec![0u8; 16];
        yuv.convert(&planar, &mut a).unwrap();
        nv12.convert(&semi, &mut b).unwrap();
        assert_eq!(a, b);
        // Strong V pushes red up
        assert!(a[0] > a[2]);
    }

    #[test]
    fn test_bgra_swizzle() {
        let converter = PixelConverter::new(PixelFormat::BGRA32, 1, 1, ColorSpace::BT709).unwrap();
        let src = RawPicture {
            format: PixelFormat::BGRA32,
            width: 1,
            height: 1,
            planes: vec![vec![1, 2, 3, 4]],
            strides: vec![4],
        };
        let mut dst = vec![0u8; 4];
        converter.convert(&src, &mut dst).unwrap();
        assert_eq!(dst, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_rejects_mismatches() {
        let converter = PixelConverter::new(PixelFormat::YUV420P, 4, 4, ColorSpace::BT709).unwrap();
        let mut dst = vec![0u8; 64];

        let wrong_size = gray_yuv420p(2, 2, 16, 0);
        assert!(matches!(
            converter.convert(&wrong_size, &mut dst),
            Err(ConvertError::SizeMismatch { .. })
        ));

        let mut short = gray_yuv420p(4, 4, 16, 0);
        short.planes[2].truncate(1);
        assert!(matches!(
            converter.convert(&short, &mut dst),
            Err(ConvertError::ShortPlane { plane: 2, .. })
        ));

        let mut small_out = vec![0u8; 8];
        assert!(matches!(
            converter.convert(&gray_yuv420p(4, 4, 16, 0), &mut small_out),
            Err(ConvertError::ShortOutput { .. })
        ));

        assert!(PixelConverter::new(PixelFormat::NV12, 0, 4, ColorSpace::BT709).is_err());
    }
}
