//! MP3 extraction.

use std::path::Path;

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Build the FFmpeg command for an MP3 extraction.
fn mp3_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("libmp3lame")
        .audio_bitrate("192k")
        .format("mp3")
}

/// Extract the audio track of `input` into an MP3 at `output`, reporting
/// parsed progress markers to `on_progress` as FFmpeg emits them.
pub async fn extract_audio<F>(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    runner: &FfmpegRunner,
    on_progress: F,
) -> MediaResult<()>
where
    F: Fn(FfmpegProgress) + Send + 'static,
{
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = mp3_command(input, output);
    debug!(
        input = %input.display(),
        output = %output.display(),
        "Extracting audio"
    );

    runner.run_with_progress(&cmd, on_progress).await
}

/// A conversion only counts as successful when the output exists and is
/// non-empty. Returns the output size in bytes.
pub async fn validate_output(output: impl AsRef<Path>) -> MediaResult<u64> {
    let output = output.as_ref();
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        _ => Err(MediaError::EmptyOutput(output.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mp3_command_arguments() {
        let args = mp3_command(Path::new("in.webm"), Path::new("out.mp3")).build_args();
        let rendered = args.join(" ");
        assert!(rendered.contains("-vn"));
        assert!(rendered.contains("-c:a libmp3lame"));
        assert!(rendered.contains("-b:a 192k"));
        assert!(rendered.contains("-f mp3"));
        assert!(rendered.ends_with("out.mp3"));
    }

    #[tokio::test]
    async fn test_validate_output_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = validate_output(dir.path().join("missing.mp3")).await;
        assert!(matches!(result, Err(MediaError::EmptyOutput(_))));
    }

    #[tokio::test]
    async fn test_validate_output_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.mp3");
        tokio::fs::write(&path, b"").await.unwrap();

        let result = validate_output(&path).await;
        assert!(matches!(result, Err(MediaError::EmptyOutput(_))));
    }

    #[tokio::test]
    async fn test_validate_output_accepts_nonempty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audio.mp3");
        tokio::fs::write(&path, b"ID3").await.unwrap();

        assert_eq!(validate_output(&path).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_extract_audio_rejects_missing_input() {
        let dir = TempDir::new().unwrap();
        let runner = FfmpegRunner::new();
        let result = extract_audio(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp3"),
            &runner,
            |_| {},
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
