use std::time::Duration;

use ndarray::ArrayView3;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Carries the sequence index and the source timestamp (time since the
/// session started). Pixel format conversion happens at the camera boundary
/// only; the flow treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: Duration,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
        timestamp: Duration,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn gradient(width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|i| i as u8).collect();
        Frame::new(data, width, height, 3, 12, Duration::from_millis(400))
    }

    #[test]
    fn test_sequence_metadata_is_kept() {
        let frame = gradient(3, 2);
        assert_eq!((frame.width(), frame.height(), frame.channels()), (3, 2, 3));
        assert_eq!(frame.index(), 12);
        assert_eq!(frame.timestamp(), Duration::from_millis(400));
        assert_eq!(frame.clone().into_data(), frame.data());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_short_buffer_is_rejected() {
        Frame::new(vec![0u8; 5], 2, 1, 3, 0, Duration::ZERO);
    }

    #[rstest]
    #[case(0, 0, [0, 1, 2])]
    #[case(0, 2, [6, 7, 8])]
    #[case(1, 0, [9, 10, 11])]
    #[case(1, 2, [15, 16, 17])]
    fn test_ndarray_view_is_row_major(
        #[case] row: usize,
        #[case] col: usize,
        #[case] rgb: [u8; 3],
    ) {
        let frame = gradient(3, 2);
        let view = frame.as_ndarray();
        assert_eq!(view.shape(), &[2, 3, 3]);
        for (c, expected) in rgb.iter().enumerate() {
            assert_eq!(view[[row, col, c]], *expected);
        }
    }
}
