use tempfile::NamedTempFile;
use tokio::process::Command;

/// Target encoding required by the transcription collaborator.
const TARGET_SAMPLE_RATE: &str = "16000";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to stage audio for transcoding: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg exited with status {0}: {1}")]
    Ffmpeg(i32, String),
}

/// Transcode stored audio (any container ffmpeg understands) to the
/// 16 kHz mono WAV the speech collaborator requires.
///
/// Scratch files live in the OS temp dir and are removed when the
/// `NamedTempFile` handles drop, on the success and failure paths
/// alike.
pub async fn to_mono_wav(input: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    let src = NamedTempFile::new()?;
    let dst = NamedTempFile::with_suffix(".wav")?;

    std::fs::write(src.path(), input)?;

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(src.path())
        .args(["-ar", TARGET_SAMPLE_RATE, "-ac", "1", "-f", "wav"])
        .arg(dst.path())
        .output()
        .await?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(TranscodeError::Ffmpeg(code, stderr));
    }

    let wav = std::fs::read(dst.path())?;
    Ok(wav)
}
