//! Timing rules for best-effort synchronized playback.
//!
//! A `sound-playing` broadcast carries the server's wall clock at the moment
//! of the broadcast. Receivers compensate for network and processing delay
//! by seeking into the clip by however much time has already passed, rather
//! than negotiating a shared clock. This tolerates the tens to hundreds of
//! milliseconds of skew a soundboard can get away with.

use std::collections::HashMap;

use crate::PrimaryKey;

/// Offsets below this are inaudible and not worth a seek
pub const MIN_SEEK_OFFSET_SECS: f32 = 0.25;

/// Where a receiver should start playback for a clip of `duration_secs`,
/// given the broadcast timestamp and its own wall clock, both in
/// milliseconds. Returns zero when the clip should play from the beginning.
pub fn seek_offset(timestamp_ms: i64, local_now_ms: i64, duration_secs: f32) -> f32 {
    let elapsed_secs = (local_now_ms - timestamp_ms) as f32 / 1000.0;

    if elapsed_secs >= MIN_SEEK_OFFSET_SECS && elapsed_secs < duration_secs {
        elapsed_secs
    } else {
        0.0
    }
}

/// The volume a listener hears: the clip's baseline volume scaled by their
/// personal preference, clamped to the valid range.
pub fn effective_volume(global_volume: f32, personal_volume: f32) -> f32 {
    (global_volume.clamp(0.0, 1.0) * personal_volume.clamp(0.0, 1.0)).clamp(0.0, 1.0)
}

/// Tracks which clip each player currently has sounding, so a new play event
/// from the same player supersedes the previous one. At most one active clip
/// is attributed to a player at a time.
#[derive(Debug, Default)]
pub struct ActiveClips {
    by_player: HashMap<String, PrimaryKey>,
}

impl ActiveClips {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a new clip for the player, returning the clip it supersedes
    /// if one was still sounding.
    pub fn begin(&mut self, played_by: &str, sound_id: PrimaryKey) -> Option<PrimaryKey> {
        self.by_player
            .insert(played_by.to_string(), sound_id)
            .filter(|&previous| previous != sound_id)
    }

    /// Clears the player's active clip if it is still the given one
    pub fn finish(&mut self, played_by: &str, sound_id: PrimaryKey) {
        if self.by_player.get(played_by) == Some(&sound_id) {
            self.by_player.remove(played_by);
        }
    }

    pub fn current(&self, played_by: &str) -> Option<PrimaryKey> {
        self.by_player.get(played_by).copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn seeks_by_elapsed_time() {
        assert_eq!(seek_offset(10_000, 11_000, 30.0), 1.0);
    }

    #[test]
    fn small_offsets_play_from_start() {
        assert_eq!(seek_offset(10_000, 10_100, 30.0), 0.0);
    }

    #[test]
    fn offsets_past_the_clip_play_from_start() {
        assert_eq!(seek_offset(10_000, 45_000, 30.0), 0.0);
    }

    #[test]
    fn clock_skew_into_the_past_plays_from_start() {
        // The receiver's clock can lag behind the server's
        assert_eq!(seek_offset(10_000, 9_500, 30.0), 0.0);
    }

    #[test]
    fn volume_is_scaled_and_clamped() {
        assert_eq!(effective_volume(0.8, 0.5), 0.4);
        assert_eq!(effective_volume(2.0, 1.0), 1.0);
        assert_eq!(effective_volume(0.5, -1.0), 0.0);
    }

    #[test]
    fn new_clip_supersedes_previous() {
        let mut active = ActiveClips::new();

        assert_eq!(active.begin("ada", 1), None);
        assert_eq!(active.begin("ada", 2), Some(1));
        assert_eq!(active.current("ada"), Some(2));
    }

    #[test]
    fn replaying_the_same_clip_does_not_supersede() {
        let mut active = ActiveClips::new();

        active.begin("ada", 1);
        assert_eq!(active.begin("ada", 1), None);
    }

    #[test]
    fn finish_only_clears_the_matching_clip() {
        let mut active = ActiveClips::new();

        active.begin("ada", 1);
        active.finish("ada", 2);
        assert_eq!(active.current("ada"), Some(1));

        active.finish("ada", 1);
        assert_eq!(active.current("ada"), None);
    }

    #[test]
    fn players_are_tracked_independently() {
        let mut active = ActiveClips::new();

        active.begin("ada", 1);
        active.begin("grace", 2);

        assert_eq!(active.current("ada"), Some(1));
        assert_eq!(active.current("grace"), Some(2));
    }
}
