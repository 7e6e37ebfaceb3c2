use std::path::Path;
use std::time::Duration;

use crate::segmenter::Cue;
use crate::{Result, SubweldError};

/// SRT (SubRip) serialization for cue sequences
///
/// Cues are written with millisecond timestamp precision and read back in
/// the same form, so a sequence survives a round trip through the sidecar
/// file with its ordering and tiling intact.
pub struct SrtFormatter;

impl SrtFormatter {
    /// Render a cue sequence as SRT file content
    pub fn render(cues: &[Cue]) -> String {
        let mut content = String::new();
        for cue in cues {
            content.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                cue.index,
                Self::format_timestamp(cue.start),
                Self::format_timestamp(cue.end),
                cue.text
            ));
        }
        content
    }

    /// Parse SRT file content back into a cue sequence
    pub fn parse(content: &str) -> Result<Vec<Cue>> {
        let mut cues = Vec::new();

        for block in content.split("\n\n").filter(|b| !b.trim().is_empty()) {
            let mut lines = block.lines().filter(|l| !l.trim().is_empty());

            let index: u32 = lines
                .next()
                .and_then(|l| l.trim().parse().ok())
                .ok_or_else(|| Self::malformed("missing cue index"))?;

            let timing = lines
                .next()
                .ok_or_else(|| Self::malformed("missing timing line"))?;
            let (start_str, end_str) = timing
                .split_once(" --> ")
                .ok_or_else(|| Self::malformed("missing timestamp arrow"))?;

            let start = Self::parse_timestamp(start_str.trim())?;
            let end = Self::parse_timestamp(end_str.trim())?;

            let text = lines.collect::<Vec<_>>().join("\n");
            if text.is_empty() {
                return Err(Self::malformed("cue has no text"));
            }

            cues.push(Cue::new(index, start, end, text));
        }

        Ok(cues)
    }

    /// Write cues as an SRT file
    pub async fn save_to_file<P: AsRef<Path>>(cues: &[Cue], path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), Self::render(cues)).await?;
        Ok(())
    }

    /// Read cues from an SRT file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Cue>> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&content)
    }

    /// Format a duration as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_timestamp(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, milliseconds)
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) into a duration
    pub fn parse_timestamp(timestamp: &str) -> Result<Duration> {
        let (hms, millis) = timestamp
            .split_once(',')
            .ok_or_else(|| Self::malformed("timestamp missing millisecond part"))?;

        let parts: Vec<&str> = hms.split(':').collect();
        if parts.len() != 3 {
            return Err(Self::malformed("timestamp is not HH:MM:SS,mmm"));
        }

        let hours: u64 = parts[0]
            .parse()
            .map_err(|_| Self::malformed("invalid hours"))?;
        let minutes: u64 = parts[1]
            .parse()
            .map_err(|_| Self::malformed("invalid minutes"))?;
        let seconds: u64 = parts[2]
            .parse()
            .map_err(|_| Self::malformed("invalid seconds"))?;
        let milliseconds: u64 = millis
            .parse()
            .map_err(|_| Self::malformed("invalid milliseconds"))?;

        let total_millis = hours
            .checked_mul(3600)
            .and_then(|h| minutes.checked_mul(60).map(|m| (h, m)))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|s| s.checked_add(seconds))
            .and_then(|s| s.checked_mul(1000))
            .and_then(|ms| ms.checked_add(milliseconds))
            .ok_or_else(|| Self::malformed("timestamp out of range"))?;
        Ok(Duration::from_millis(total_millis))
    }

    fn malformed(reason: &str) -> SubweldError {
        SubweldError::Configuration(format!("malformed SRT content: {}", reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(
            SrtFormatter::format_timestamp(Duration::from_secs(3661)),
            "01:01:01,000"
        );
        assert_eq!(
            SrtFormatter::format_timestamp(Duration::from_millis(1500)),
            "00:00:01,500"
        );
        assert_eq!(
            SrtFormatter::format_timestamp(Duration::ZERO),
            "00:00:00,000"
        );
    }

    #[test]
    fn test_timestamp_parsing() {
        assert_eq!(
            SrtFormatter::parse_timestamp("01:01:01,000").unwrap(),
            Duration::from_secs(3661)
        );
        assert_eq!(
            SrtFormatter::parse_timestamp("00:00:01,500").unwrap(),
            Duration::from_millis(1500)
        );
        assert!(SrtFormatter::parse_timestamp("1:2:3").is_err());
    }

    #[test]
    fn test_oversized_timestamp_rejected_without_panic() {
        let result = SrtFormatter::parse_timestamp("9999999999999999999:00:00,000");
        assert!(matches!(result, Err(SubweldError::Configuration(_))));
    }

    #[test]
    fn test_render_produces_srt_blocks() {
        let cues = vec![
            Cue::new(
                1,
                Duration::ZERO,
                Duration::from_secs(5),
                "First line".to_string(),
            ),
            Cue::new(
                2,
                Duration::from_secs(5),
                Duration::from_secs(10),
                "Second line".to_string(),
            ),
        ];

        let content = SrtFormatter::render(&cues);
        assert!(content.contains("1\n00:00:00,000 --> 00:00:05,000\nFirst line"));
        assert!(content.contains("2\n00:00:05,000 --> 00:00:10,000\nSecond line"));
    }

    #[test]
    fn test_parse_reads_back_ordering() {
        let content = "1\n00:00:00,000 --> 00:00:03,500\nHello there\n\n\
                       2\n00:00:03,500 --> 00:00:07,000\nGeneral greeting\n";
        let cues = SrtFormatter::parse(content).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].end, cues[1].start);
        assert_eq!(cues[1].text, "General greeting");
    }

    #[test]
    fn test_parse_rejects_missing_timing() {
        let content = "1\nHello there\n";
        assert!(SrtFormatter::parse(content).is_err());
    }

    #[test]
    fn test_sidecar_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitles.srt");
        let cues = vec![
            Cue::new(
                1,
                Duration::ZERO,
                Duration::from_millis(2500),
                "First".to_string(),
            ),
            Cue::new(
                2,
                Duration::from_millis(2500),
                Duration::from_secs(5),
                "Second".to_string(),
            ),
        ];

        tokio_test::block_on(async {
            SrtFormatter::save_to_file(&cues, &path).await.unwrap();
            let parsed = SrtFormatter::load_from_file(&path).await.unwrap();
            assert_eq!(parsed, cues);
        });
    }

    #[test]
    fn test_millisecond_precision_survives() {
        let cue = Cue::new(
            1,
            Duration::from_millis(1234),
            Duration::from_millis(5678),
            "precise".to_string(),
        );
        let parsed = SrtFormatter::parse(&SrtFormatter::render(&[cue.clone()])).unwrap();
        assert_eq!(parsed[0].start, cue.start);
        assert_eq!(parsed[0].end, cue.end);
    }
}
