//! Quantum-to-device adapter owned by the output callback
//!
//! The player renders fixed-size quanta; devices ask for whatever buffer
//! size they negotiated. [`OutputRenderer`] keeps one staged quantum and
//! copies it out across as many callbacks as it takes.

use crate::player::{Player, PlayerCommand};
use crate::types::QuantumBuffer;

/// Audio-thread state: the player, its command queue and the staged quantum
pub struct OutputRenderer {
    player: Player,
    command_rx: rtrb::Consumer<PlayerCommand>,
    staging: QuantumBuffer,
    /// Next unplayed frame in `staging`; equal to the quantum size when empty
    read_pos: usize,
}

impl OutputRenderer {
    pub fn new(
        player: Player,
        command_rx: rtrb::Consumer<PlayerCommand>,
        channel_count: usize,
        quantum_size: usize,
    ) -> Self {
        let staging = QuantumBuffer::silence(channel_count, quantum_size.max(1));
        let read_pos = staging.frames();
        Self {
            player,
            command_rx,
            staging,
            read_pos,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Fill an interleaved device buffer
    ///
    /// Pending commands are applied first. When one changes what is heard
    /// (see [`Player::process_commands`]) the rest of the staged quantum is
    /// dropped so the change takes effect in this callback.
    pub fn render(&mut self, data: &mut [f32], device_channels: usize) {
        let device_channels = device_channels.max(1);
        if self.player.process_commands(&mut self.command_rx) {
            self.read_pos = self.staging.frames();
        }

        let quantum = self.staging.frames();
        let total = data.len() / device_channels;
        let mut done = 0;
        while done < total {
            if self.read_pos >= quantum {
                self.player.process(&mut self.staging);
                self.read_pos = 0;
            }
            let n = (quantum - self.read_pos).min(total - done);
            let out = &mut data[done * device_channels..(done + n) * device_channels];
            self.staging.write_interleaved(out, device_channels, self.read_pos);
            self.read_pos += n;
            done += n;
        }
        data[total * device_channels..].fill(0.0);
        self.player.set_unplayed_frames(quantum - self.read_pos);
    }
}
