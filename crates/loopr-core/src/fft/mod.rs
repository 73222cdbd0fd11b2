//! Fixed-size radix-2 Fourier transform
//!
//! The spectral building block under the phase vocoder. A transform is built
//! once for one power-of-two size and reused for every frame, so all tables
//! and working arrays are allocated up front and `forward`/`inverse` never
//! touch the heap.
//!
//! # Algorithm
//!
//! Iterative decimation-in-time: inputs are permuted into bit-reversed order,
//! then butterflies run for `half_size = 1, 2, 4, ... size/2`. Each stage
//! starts from the twiddle `(cos(-π/half), sin(-π/half))` and rotates it by
//! complex multiplication instead of calling trig functions per butterfly.
//!
//! The inverse conjugates its input, runs the same network and scales by
//! `1/size`, writing only the real part.

use crate::error::{LooprError, LooprResult};

/// Forward and inverse FFT for one fixed power-of-two size
#[derive(Debug, Clone)]
pub struct Fft {
    buffer_size: usize,
    sample_rate: f64,
    band_width: f64,
    /// One-sided magnitude spectrum of the last forward transform
    spectrum: Vec<f64>,
    /// Real part of the last forward transform
    real: Vec<f64>,
    /// Imaginary part of the last forward transform
    imag: Vec<f64>,
    peak_band: usize,
    peak: f64,
    reverse_table: Vec<usize>,
    /// `sin(-π/i)`; entry 0 is never read
    sin_table: Vec<f64>,
    /// `cos(-π/i)`; entry 0 is never read
    cos_table: Vec<f64>,
    /// Working arrays for `inverse`
    rev_real: Vec<f64>,
    rev_imag: Vec<f64>,
}

impl Fft {
    /// Build a transform for `buffer_size` samples at `sample_rate` Hz
    ///
    /// Fails with `InvalidInput` unless `buffer_size` is a power of two.
    pub fn new(buffer_size: usize, sample_rate: f64) -> LooprResult<Self> {
        if !buffer_size.is_power_of_two() {
            return Err(LooprError::InvalidInput(format!(
                "FFT size {} is not a power of two",
                buffer_size
            )));
        }

        let mut reverse_table = vec![0usize; buffer_size];
        let mut limit = 1;
        let mut bit = buffer_size >> 1;
        while limit < buffer_size {
            for i in 0..limit {
                reverse_table[i + limit] = reverse_table[i] + bit;
            }
            limit <<= 1;
            bit >>= 1;
        }

        let mut sin_table = vec![0.0; buffer_size];
        let mut cos_table = vec![0.0; buffer_size];
        for i in 1..buffer_size {
            let angle = -std::f64::consts::PI / i as f64;
            sin_table[i] = angle.sin();
            cos_table[i] = angle.cos();
        }

        Ok(Self {
            buffer_size,
            sample_rate,
            band_width: 2.0 / buffer_size as f64 * sample_rate / 2.0,
            spectrum: vec![0.0; buffer_size / 2],
            real: vec![0.0; buffer_size],
            imag: vec![0.0; buffer_size],
            peak_band: 0,
            peak: 0.0,
            reverse_table,
            sin_table,
            cos_table,
            rev_real: vec![0.0; buffer_size],
            rev_imag: vec![0.0; buffer_size],
        })
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Width of one frequency bin in Hz
    #[inline]
    pub fn band_width(&self) -> f64 {
        self.band_width
    }

    /// Centre frequency of bin `index` in Hz
    pub fn band_frequency(&self, index: usize) -> f64 {
        self.band_width * index as f64 + self.band_width / 2.0
    }

    /// Magnitude spectrum of the last forward transform (`buffer_size / 2` bins)
    pub fn spectrum(&self) -> &[f64] {
        &self.spectrum
    }

    pub fn real(&self) -> &[f64] {
        &self.real
    }

    pub fn imag(&self) -> &[f64] {
        &self.imag
    }

    /// Bin index with the largest magnitude in the last forward transform
    #[inline]
    pub fn peak_band(&self) -> usize {
        self.peak_band
    }

    /// Largest magnitude in the last forward transform
    #[inline]
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Transform a block of real samples
    ///
    /// Results are available through [`real`](Self::real),
    /// [`imag`](Self::imag) and [`spectrum`](Self::spectrum).
    pub fn forward(&mut self, buffer: &[f64]) -> LooprResult<()> {
        self.check_len("input", buffer.len())?;

        for i in 0..self.buffer_size {
            self.real[i] = buffer[self.reverse_table[i]];
            self.imag[i] = 0.0;
        }

        butterflies(&mut self.real, &mut self.imag, &self.cos_table, &self.sin_table);
        self.calculate_spectrum();
        Ok(())
    }

    /// Inverse transform into `out`
    ///
    /// `None` for `real`/`imag` uses the result of the last forward transform.
    /// The caller's arrays are left untouched.
    pub fn inverse(
        &mut self,
        real: Option<&[f64]>,
        imag: Option<&[f64]>,
        out: &mut [f64],
    ) -> LooprResult<()> {
        let real = real.unwrap_or(self.real.as_slice());
        let imag = imag.unwrap_or(self.imag.as_slice());
        self.check_len("real", real.len())?;
        self.check_len("imag", imag.len())?;
        self.check_len("output", out.len())?;

        for i in 0..self.buffer_size {
            let j = self.reverse_table[i];
            self.rev_real[i] = real[j];
            self.rev_imag[i] = -imag[j];
        }

        butterflies(
            &mut self.rev_real,
            &mut self.rev_imag,
            &self.cos_table,
            &self.sin_table,
        );

        let scale = self.buffer_size as f64;
        for (o, r) in out.iter_mut().zip(&self.rev_real) {
            *o = r / scale;
        }
        Ok(())
    }

    fn check_len(&self, what: &str, len: usize) -> LooprResult<()> {
        if len != self.buffer_size {
            return Err(LooprError::InvalidInput(format!(
                "{} buffer has {} samples, FFT size is {}",
                what, len, self.buffer_size
            )));
        }
        Ok(())
    }

    fn calculate_spectrum(&mut self) {
        let scale = 2.0 / self.buffer_size as f64;
        self.peak = 0.0;
        self.peak_band = 0;

        for i in 0..self.buffer_size / 2 {
            let re = self.real[i];
            let im = self.imag[i];
            let mag = scale * (re * re + im * im).sqrt();
            if mag > self.peak {
                self.peak_band = i;
                self.peak = mag;
            }
            self.spectrum[i] = mag;
        }
    }
}

/// Radix-2 butterfly network over bit-reversed data
fn butterflies(real: &mut [f64], imag: &mut [f64], cos_table: &[f64], sin_table: &[f64]) {
    let size = real.len();
    let mut half_size = 1;

    while half_size < size {
        let step_real = cos_table[half_size];
        let step_imag = sin_table[half_size];
        let mut phase_real = 1.0;
        let mut phase_imag = 0.0;

        for fft_step in 0..half_size {
            let mut i = fft_step;
            while i < size {
                let off = i + half_size;
                let tr = phase_real * real[off] - phase_imag * imag[off];
                let ti = phase_real * imag[off] + phase_imag * real[off];

                real[off] = real[i] - tr;
                imag[off] = imag[i] - ti;
                real[i] += tr;
                imag[i] += ti;

                i += half_size << 1;
            }

            let tmp = phase_real;
            phase_real = tmp * step_real - phase_imag * step_imag;
            phase_imag = tmp * step_imag + phase_imag * step_real;
        }

        half_size <<= 1;
    }
}
