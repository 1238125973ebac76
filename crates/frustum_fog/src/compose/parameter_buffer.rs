//! Per-category GPU parameter buffer
//!
//! One fixed-stride record per visible object, repopulated in visibility
//! order every frame. Row `i` means "the `i`-th visible object this frame";
//! there is no stable slot per object.

use bytemuck::Pod;

use crate::gpu::{release_buffer_quietly, BufferHandle, GpuBackend, GpuError, GpuResult};

/// Structured buffer sized to the visible object count
pub struct ParameterBuffer {
    label: &'static str,
    stride: usize,
    count: usize,
    staging: Vec<u8>,
    buffer: Option<BufferHandle>,
}

impl ParameterBuffer {
    /// Create an empty buffer of `stride`-byte records
    pub fn new(label: &'static str, stride: usize) -> Self {
        Self { label, stride, count: 0, staging: Vec::new(), buffer: None }
    }

    /// Create an empty buffer sized for records of type `R`
    pub fn for_record<R: Pod>(label: &'static str) -> Self {
        Self::new(label, std::mem::size_of::<R>())
    }

    /// Start a frame of `count` records
    ///
    /// The GPU buffer and the staging array are reallocated only when `count`
    /// differs from the previous frame. Zero records means no GPU buffer.
    pub fn prepare(&mut self, backend: &mut dyn GpuBackend, count: usize) -> GpuResult<()> {
        if count != self.count || (count > 0 && self.buffer.is_none()) {
            if let Some(old) = self.buffer.take() {
                release_buffer_quietly(backend, old);
            }
            if count > 0 {
                self.buffer = Some(backend.create_buffer(count, self.stride, self.label)?);
            }
            self.staging = Vec::with_capacity(count * self.stride);
            log::debug!("{}: resized to {} record(s)", self.label, count);
            self.count = count;
        }
        self.staging.clear();
        Ok(())
    }

    /// Append one record to the staging array
    pub fn push<R: Pod>(&mut self, record: &R) -> GpuResult<()> {
        let bytes = bytemuck::bytes_of(record);
        if bytes.len() != self.stride {
            return Err(GpuError::InvalidBufferWrite(format!(
                "{}: record of {} bytes, stride is {}",
                self.label,
                bytes.len(),
                self.stride
            )));
        }
        if self.staging.len() + bytes.len() > self.count * self.stride {
            return Err(GpuError::InvalidBufferWrite(format!("{}: more records than the {} prepared", self.label, self.count)));
        }
        self.staging.extend_from_slice(bytes);
        Ok(())
    }

    /// Upload the staged records in one call
    pub fn upload(&mut self, backend: &mut dyn GpuBackend) -> GpuResult<()> {
        let expected = self.count * self.stride;
        if self.staging.len() != expected {
            return Err(GpuError::InvalidBufferWrite(format!(
                "{}: {} of {} bytes staged",
                self.label,
                self.staging.len(),
                expected
            )));
        }
        match self.buffer {
            Some(buffer) => backend.write_buffer(buffer, 0, &self.staging),
            None => Ok(()),
        }
    }

    /// Record count of the current frame
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Record size in bytes
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// GPU buffer, `None` when the count is zero
    pub const fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Staged bytes of the current frame
    pub fn staged_bytes(&self) -> &[u8] {
        &self.staging
    }

    /// Release the GPU buffer
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(buffer) = self.buffer.take() {
            release_buffer_quietly(backend, buffer);
        }
        self.count = 0;
        self.staging.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    #[test]
    fn test_reallocates_only_on_count_change() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = ParameterBuffer::for_record::<[f32; 4]>("TestBuffer");

        for _ in 0..3 {
            buffer.prepare(&mut backend, 2).unwrap();
            buffer.push(&[1.0f32; 4]).unwrap();
            buffer.push(&[2.0f32; 4]).unwrap();
            buffer.upload(&mut backend).unwrap();
        }
        assert_eq!(backend.stats().buffers_created, 1);

        buffer.prepare(&mut backend, 3).unwrap();
        assert_eq!(backend.stats().buffers_created, 2);
        assert_eq!(backend.live_buffers(), 1);
        assert_eq!(buffer.count(), 3);
    }

    #[test]
    fn test_zero_count_has_no_gpu_buffer() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = ParameterBuffer::for_record::<[f32; 4]>("TestBuffer");
        buffer.prepare(&mut backend, 1).unwrap();
        buffer.prepare(&mut backend, 0).unwrap();
        assert!(buffer.buffer().is_none());
        assert!(buffer.upload(&mut backend).is_ok());
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_upload_writes_staged_bytes() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = ParameterBuffer::for_record::<[i32; 2]>("TestBuffer");
        buffer.prepare(&mut backend, 1).unwrap();
        buffer.push(&[7i32, -1]).unwrap();
        buffer.upload(&mut backend).unwrap();
        let contents = backend.buffer_contents(buffer.buffer().unwrap()).unwrap();
        assert_eq!(contents, bytemuck::bytes_of(&[7i32, -1]));
    }

    #[test]
    fn test_stride_and_overflow_are_rejected() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = ParameterBuffer::for_record::<[f32; 4]>("TestBuffer");
        buffer.prepare(&mut backend, 1).unwrap();
        assert!(buffer.push(&1.0f32).is_err());
        buffer.push(&[0.0f32; 4]).unwrap();
        assert!(buffer.push(&[0.0f32; 4]).is_err());
    }

    #[test]
    fn test_incomplete_frame_is_not_uploaded() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = ParameterBuffer::for_record::<[f32; 4]>("TestBuffer");
        buffer.prepare(&mut backend, 2).unwrap();
        buffer.push(&[0.0f32; 4]).unwrap();
        assert!(buffer.upload(&mut backend).is_err());
        assert_eq!(backend.stats().buffer_writes, 0);
    }
}
