use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::encoder::FrameEncoder;
use super::types::{EncodeRequest, EncodeSource, StillFormat};
use crate::error_handling::types::EncodeError;

// Longest stderr excerpt kept in an error
const STDERR_EXCERPT: usize = 512;

/// [`FrameEncoder`] backed by the `ffmpeg` command-line tool.
///
/// Each request spawns one `ffmpeg` process writing a single frame to stdout.
/// The process is killed and reaped when the request times out.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    avif_speed: u8,
}

impl FfmpegEncoder {
    pub fn new(binary: PathBuf, avif_speed: u8) -> Self {
        Self { binary, avif_speed }
    }

    /// Builds the argument vector for `request`.
    pub fn arguments(&self, request: &EncodeRequest<'_>) -> Vec<String> {
        let mut args: Vec<String> = ["-loglevel", "error", "-nostdin", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        match request.source {
            EncodeSource::Stream(url) => {
                args.push("-i".into());
                args.push(url.to_string());
            }
            EncodeSource::Piped { format, .. } => {
                args.extend(
                    ["-f", "image2pipe", "-vcodec", codec_name(format), "-i", "pipe:0"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
        }

        args.push("-frames:v".into());
        args.push("1".into());
        if let Some(width) = request.scale_width {
            args.push("-vf".into());
            args.push(format!("scale={}:-2", width));
        }
        args.push("-an".into());

        match request.output {
            StillFormat::Avif => {
                args.extend(
                    ["-c:v", "libaom-av1", "-still-picture", "1", "-cpu-used"]
                        .iter()
                        .map(|s| s.to_string()),
                );
                args.push(self.avif_speed.to_string());
                args.push("-f".into());
                args.push("image2".into());
            }
            StillFormat::Png => {
                args.extend(
                    ["-f", "image2", "-vcodec", "png"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
        }

        args.push("pipe:1".into());
        args
    }

    async fn run(
        &self,
        args: Vec<String>,
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Vec<u8>, EncodeError> {
        trace!("Running {} {:?}", self.binary.display(), args);

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(EncodeError::Spawn)?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EncodeError::IoError(io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::IoError(io::Error::other("stderr not captured")))?;

        let feed = async move {
            if let (Some(mut pipe), Some(data)) = (stdin, input) {
                pipe.write_all(data).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), io::Error>(())
        };

        let outcome = tokio::time::timeout(timeout, async {
            let (fed, out, err) = tokio::join!(feed, drain(stdout), drain(stderr));
            let status = child.wait().await;
            (fed, out, err, status)
        })
        .await;

        let (fed, out, err, status) = match outcome {
            Ok(finished) => finished,
            Err(_) => {
                // kill() also waits for the process, so nothing is left behind
                if let Err(e) = child.kill().await {
                    warn!("Unable to kill timed out encoder: {}", e);
                }
                return Err(EncodeError::Timeout(timeout));
            }
        };

        let status = status.map_err(EncodeError::IoError)?;
        let stderr = excerpt(&err.unwrap_or_default());
        if !status.success() {
            return Err(EncodeError::NonZeroExit {
                code: status.code(),
                stderr,
            });
        }
        if let Err(e) = fed {
            // The encoder may stop reading once it has its frame
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(EncodeError::IoError(e));
            }
            debug!("Encoder closed stdin early: {}", e);
        }
        let bytes = out.map_err(EncodeError::IoError)?;
        if bytes.is_empty() {
            return Err(EncodeError::EmptyOutput);
        }
        if !stderr.is_empty() {
            debug!("Encoder stderr: {}", stderr);
        }
        Ok(bytes)
    }
}

impl FrameEncoder for FfmpegEncoder {
    async fn encode(&self, request: EncodeRequest<'_>) -> Result<Vec<u8>, EncodeError> {
        let args = self.arguments(&request);
        let input = match request.source {
            EncodeSource::Piped { data, .. } => Some(data),
            EncodeSource::Stream(_) => None,
        };
        self.run(args, input, request.timeout).await
    }
}

fn codec_name(format: StillFormat) -> &'static str {
    match format {
        StillFormat::Avif => "libaom-av1",
        StillFormat::Png => "png",
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{} ...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: EncodeSource<'_>, output: StillFormat) -> EncodeRequest<'_> {
        EncodeRequest {
            source,
            output,
            scale_width: Some(1280),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn direct_avif_arguments() {
        let encoder = FfmpegEncoder::new(PathBuf::from("ffmpeg"), 6);
        let args = encoder.arguments(&request(
            EncodeSource::Stream("https://cams.example/a.m3u8"),
            StillFormat::Avif,
        ));
        assert_eq!(
            args,
            vec![
                "-loglevel", "error", "-nostdin", "-y", "-i",
                "https://cams.example/a.m3u8", "-frames:v", "1", "-vf", "scale=1280:-2", "-an",
                "-c:v", "libaom-av1", "-still-picture", "1", "-cpu-used", "6", "-f", "image2",
                "pipe:1",
            ]
        );
    }

    #[test]
    fn png_fallback_arguments() {
        let encoder = FfmpegEncoder::new(PathBuf::from("ffmpeg"), 6);
        let args = encoder.arguments(&request(
            EncodeSource::Stream("rtsp://cam/live"),
            StillFormat::Png,
        ));
        assert_eq!(
            args,
            vec![
                "-loglevel", "error", "-nostdin", "-y", "-i", "rtsp://cam/live", "-frames:v",
                "1", "-vf", "scale=1280:-2", "-an", "-f", "image2", "-vcodec", "png", "pipe:1",
            ]
        );
    }

    #[test]
    fn reencode_arguments_read_stdin_without_scaling() {
        let encoder = FfmpegEncoder::new(PathBuf::from("ffmpeg"), 4);
        let data = [0u8; 4];
        let args = encoder.arguments(&EncodeRequest {
            source: EncodeSource::Piped {
                data: &data,
                format: StillFormat::Png,
            },
            output: StillFormat::Avif,
            scale_width: None,
            timeout: Duration::from_secs(5),
        });
        assert_eq!(
            args,
            vec![
                "-loglevel", "error", "-nostdin", "-y", "-f", "image2pipe", "-vcodec", "png",
                "-i", "pipe:0", "-frames:v", "1", "-an", "-c:v", "libaom-av1", "-still-picture",
                "1", "-cpu-used", "4", "-f", "image2", "pipe:1",
            ]
        );
    }

    #[test]
    fn long_stderr_is_cut() {
        let noise = "x".repeat(STDERR_EXCERPT + 100);
        let cut = excerpt(noise.as_bytes());
        assert!(cut.ends_with(" ..."));
        assert_eq!(cut.len(), STDERR_EXCERPT + 4);
        assert_eq!(excerpt(b"  short\n"), "short");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use serial_test::serial;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        // Writes a shell script standing in for ffmpeg; it ignores its arguments
        fn script(dir: &TempDir, body: &str) -> FfmpegEncoder {
            let path = dir.path().join("fake-ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            FfmpegEncoder::new(path, 6)
        }

        fn stream_request(timeout: Duration) -> EncodeRequest<'static> {
            EncodeRequest {
                source: EncodeSource::Stream("https://cams.example/a.m3u8"),
                output: StillFormat::Avif,
                scale_width: Some(640),
                timeout,
            }
        }

        #[tokio::test]
        #[serial]
        async fn returns_stdout_on_success() {
            let dir = TempDir::new().unwrap();
            let encoder = script(&dir, "printf 'AVIFDATA'");
            let bytes = encoder
                .encode(stream_request(Duration::from_secs(5)))
                .await
                .unwrap();
            assert_eq!(bytes, b"AVIFDATA");
        }

        #[tokio::test]
        #[serial]
        async fn non_zero_exit_keeps_stderr() {
            let dir = TempDir::new().unwrap();
            let encoder = script(&dir, "echo 'Server returned 404 Not Found' >&2\nexit 3");
            match encoder.encode(stream_request(Duration::from_secs(5))).await {
                Err(EncodeError::NonZeroExit { code, stderr }) => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "Server returned 404 Not Found");
                }
                other => panic!("expected non-zero exit, got {:?}", other),
            }
        }

        #[tokio::test]
        #[serial]
        async fn empty_output_is_a_failure() {
            let dir = TempDir::new().unwrap();
            let encoder = script(&dir, "exit 0");
            assert!(matches!(
                encoder.encode(stream_request(Duration::from_secs(5))).await,
                Err(EncodeError::EmptyOutput)
            ));
        }

        #[tokio::test]
        #[serial]
        async fn slow_encoder_times_out() {
            let dir = TempDir::new().unwrap();
            let encoder = script(&dir, "exec sleep 30");
            let started = std::time::Instant::now();
            let result = encoder
                .encode(stream_request(Duration::from_millis(300)))
                .await;
            assert!(matches!(result, Err(EncodeError::Timeout(_))));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        #[serial]
        async fn piped_input_reaches_stdin() {
            let dir = TempDir::new().unwrap();
            let encoder = script(&dir, "exec cat");
            let png = b"\x89PNG fake frame".to_vec();
            let bytes = encoder
                .encode(EncodeRequest {
                    source: EncodeSource::Piped {
                        data: &png,
                        format: StillFormat::Png,
                    },
                    output: StillFormat::Avif,
                    scale_width: None,
                    timeout: Duration::from_secs(5),
                })
                .await
                .unwrap();
            assert_eq!(bytes, png);
        }

        #[tokio::test]
        #[serial]
        async fn missing_binary_fails_to_spawn() {
            let encoder = FfmpegEncoder::new(PathBuf::from("/nonexistent/ffmpeg"), 6);
            assert!(matches!(
                encoder.encode(stream_request(Duration::from_secs(5))).await,
                Err(EncodeError::Spawn(_))
            ));
        }
    }
}
