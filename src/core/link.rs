use crate::core::repr::lamp::{
    finalize_frame,
    Carrier,
    EndFlag,
    Timestamp,
};
use crate::Result;

/// A low level interface for sending and receiving raw frames across a link.
pub trait Link {
    /// Sends a complete frame across the link.
    fn send(&mut self, buffer: &[u8]) -> Result<()>;

    /// Reads a frame from the link into the buffer and returns the size of
    /// the frame. The buffer should hold at least MTU bytes or the frame may
    /// be truncated.
    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Sends a frame carrying a LaMP packet at lamp_offset, applying the end
    /// flag and stamping the clock right before the frame leaves.
    fn send_lamp(
        &mut self,
        frame: &mut [u8],
        lamp_offset: usize,
        end_flag: EndFlag,
        carrier: Carrier,
    ) -> Result<()> {
        finalize_frame(frame, lamp_offset, end_flag, carrier, Timestamp::now())?;
        self.send(frame)
    }
}
