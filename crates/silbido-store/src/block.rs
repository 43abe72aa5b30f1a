//! Bounded-memory patch buffering
//!
//! `BlockWriter` keeps one fixed-capacity buffer per array and hands the
//! filled prefix to a `BlockSink` when the buffer is full or the run is
//! finished. The sink is created on the first flush only, so a run that
//! produces no patches leaves nothing behind.

use crate::error::{Result, StoreError};
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

/// A run of rows for all three arrays
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    pub data: ArrayView3<'a, f32>,
    pub label: ArrayView3<'a, f32>,
    pub positive_flag: ArrayView1<'a, f32>,
}

impl BlockView<'_> {
    pub fn rows(&self) -> usize {
        self.positive_flag.len()
    }

    /// (freq_bins, time_bins)
    pub fn patch_shape(&self) -> (usize, usize) {
        let (_, freq_bins, time_bins) = self.data.dim();
        (freq_bins, time_bins)
    }
}

/// Owned rows read back from a store
#[derive(Debug, Clone, PartialEq)]
pub struct PatchBlock {
    pub data: Array3<f32>,
    pub label: Array3<f32>,
    pub positive_flag: Array1<f32>,
}

impl PatchBlock {
    pub fn empty(shape: (usize, usize)) -> Self {
        Self {
            data: Array3::zeros((0, shape.0, shape.1)),
            label: Array3::zeros((0, shape.0, shape.1)),
            positive_flag: Array1::zeros(0),
        }
    }

    pub fn rows(&self) -> usize {
        self.positive_flag.len()
    }

    pub fn view(&self) -> BlockView<'_> {
        BlockView {
            data: self.data.view(),
            label: self.label.view(),
            positive_flag: self.positive_flag.view(),
        }
    }

    /// Row `index` as (spectrogram, mask, positive)
    pub fn row(&self, index: usize) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>, bool) {
        (
            self.data.index_axis(Axis(0), index),
            self.label.index_axis(Axis(0), index),
            self.positive_flag[index] != 0.0,
        )
    }
}

/// Destination of flushed blocks
pub trait BlockSink {
    /// Create the backing arrays holding the first block
    fn create(&mut self, block: BlockView<'_>) -> Result<()>;

    /// Grow the arrays by the block's rows
    fn append(&mut self, block: BlockView<'_>) -> Result<()>;
}

/// Buffers patches and flushes them in blocks of at most `capacity` rows
pub struct BlockWriter<S> {
    sink: S,
    capacity: usize,
    shape: Option<(usize, usize)>,
    data: Array3<f32>,
    label: Array3<f32>,
    positive_flag: Array1<f32>,
    offset: usize,
    created: bool,
    rows_written: u64,
    flushes: usize,
}

impl<S: BlockSink> BlockWriter<S> {
    pub fn new(sink: S, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StoreError::ZeroCapacity);
        }

        Ok(Self {
            sink,
            capacity,
            shape: None,
            data: Array3::zeros((0, 0, 0)),
            label: Array3::zeros((0, 0, 0)),
            positive_flag: Array1::zeros(0),
            offset: 0,
            created: false,
            rows_written: 0,
            flushes: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows handed to the sink so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Rows waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.offset
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Buffer one patch, flushing when the buffer fills up
    pub fn push(
        &mut self,
        spectrogram: ArrayView2<'_, f32>,
        mask: ArrayView2<'_, f32>,
        positive: bool,
    ) -> Result<()> {
        let shape = match self.shape {
            Some(shape) => shape,
            None => self.allocate(spectrogram.dim()),
        };

        for found in [spectrogram.dim(), mask.dim()] {
            if found != shape {
                return Err(StoreError::ShapeMismatch {
                    expected: shape,
                    found,
                });
            }
        }

        self.data.index_axis_mut(Axis(0), self.offset).assign(&spectrogram);
        self.label.index_axis_mut(Axis(0), self.offset).assign(&mask);
        self.positive_flag[self.offset] = if positive { 1.0 } else { 0.0 };
        self.offset += 1;

        if self.offset == self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush whatever is buffered and return the sink
    pub fn finish(mut self) -> Result<S> {
        if self.offset > 0 {
            self.flush()?;
        }
        Ok(self.sink)
    }

    fn allocate(&mut self, shape: (usize, usize)) -> (usize, usize) {
        let (freq_bins, time_bins) = shape;
        self.data = Array3::zeros((self.capacity, freq_bins, time_bins));
        self.label = Array3::zeros((self.capacity, freq_bins, time_bins));
        self.positive_flag = Array1::zeros(self.capacity);
        self.shape = Some(shape);
        shape
    }

    fn flush(&mut self) -> Result<()> {
        let rows = self.offset;
        let block = BlockView {
            data: self.data.slice(s![..rows, .., ..]),
            label: self.label.slice(s![..rows, .., ..]),
            positive_flag: self.positive_flag.slice(s![..rows]),
        };

        if self.created {
            self.sink.append(block)?;
        } else {
            self.sink.create(block)?;
            self.created = true;
        }

        self.rows_written += rows as u64;
        self.flushes += 1;
        self.offset = 0;

        log::debug!(
            "Flushed block of {} rows ({} rows total)",
            rows,
            self.rows_written
        );
        Ok(())
    }
}
