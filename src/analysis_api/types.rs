use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::UNIX_EPOCH,
};

use serde::{Deserialize, Serialize};

use super::{ApiError, lenient};

/// How strictly the backend flags joint deviations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Only flags major differences.
    #[default]
    Beginner,
    /// Balanced analysis for most dancers.
    Intermediate,
    /// Catches subtle differences.
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    /// Lowercase name sent in the `difficulty` form field.
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    /// Angle deviation in degrees above which the backend reports an issue.
    pub fn threshold_degrees(self) -> f64 {
        match self {
            Self::Beginner => 15.0,
            Self::Intermediate => 10.0,
            Self::Advanced => 5.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.api_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                format!("Unknown difficulty '{trimmed}' (expected beginner, intermediate or advanced)")
            })
    }
}

/// A body-part label with coaching text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SuggestionWire")]
pub struct Suggestion {
    pub part: String,
    pub text: String,
}

/// Part label used for suggestions the backend sends as bare strings.
pub const GENERAL_SUGGESTION_PART: &str = "general";

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionWire {
    Text(String),
    Entry {
        #[serde(default, deserialize_with = "lenient::text")]
        part: String,
        #[serde(default, deserialize_with = "lenient::text")]
        text: String,
    },
}

impl From<SuggestionWire> for Suggestion {
    fn from(wire: SuggestionWire) -> Self {
        match wire {
            SuggestionWire::Text(text) => Self {
                part: GENERAL_SUGGESTION_PART.to_string(),
                text,
            },
            SuggestionWire::Entry { part, text } => Self { part, text },
        }
    }
}

/// Angular deviation at one joint between the reference and the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointIssue {
    #[serde(default, deserialize_with = "lenient::text")]
    pub joint: String,
    /// Signed deviation in degrees.
    #[serde(default, deserialize_with = "lenient::number")]
    pub delta_angle: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub suggestion: String,
}

/// One analyzed instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(default, deserialize_with = "lenient::text")]
    pub frame_id: String,
    /// Seconds from the start of the video.
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub timestamp: Option<f64>,
    /// Normalized error in `[0, 1]` once the result has been post-processed.
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient::list")]
    pub joint_issues: Vec<JointIssue>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub suggestions: Vec<Suggestion>,
}

/// One backend response for a pair of videos.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient::text")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub difficulty_name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub threshold: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fps: f64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub frames_analyzed: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub problematic_frames: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_error: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_error: f64,
    #[serde(default, deserialize_with = "lenient::list")]
    pub results: Vec<FrameResult>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub suggestions: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
}

/// Per-request analysis options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnalysisOptions {
    /// Omitted from the request when `None`; the backend uses its own default.
    pub difficulty: Option<Difficulty>,
    /// Sampling rate for pose extraction; `None` sends the default.
    pub fps: Option<f32>,
}

/// Frame rate sent when the caller does not choose one.
pub const DEFAULT_FPS: f32 = 10.0;

impl AnalysisOptions {
    /// The `fps` form field value.
    pub fn fps_field(&self) -> String {
        let fps = self
            .fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(DEFAULT_FPS);
        if fps.fract() == 0.0 {
            format!("{fps:.1}")
        } else {
            fps.to_string()
        }
    }
}

/// A video file on disk, with the identity used to detect self-comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFile {
    path: PathBuf,
    file_name: String,
    size: u64,
    modified_ms: u128,
}

impl VideoFile {
    /// Read the metadata of a video file without loading its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| ApiError::Video {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ApiError::Video {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: metadata.len(),
            modified_ms,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// True when name, size and modification time all match.
    pub fn is_same_video(&self, other: &VideoFile) -> bool {
        self.file_name == other.file_name
            && self.size == other.size
            && self.modified_ms == other.modified_ms
    }

    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> &'static str {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("mp4") | Some("m4v") => "video/mp4",
            Some("mov") => "video/quicktime",
            Some("webm") => "video/webm",
            Some("avi") => "video/x-msvideo",
            Some("mkv") => "video/x-matroska",
            _ => "application/octet-stream",
        }
    }

    pub(crate) fn read_bytes(&self) -> Result<Vec<u8>, ApiError> {
        std::fs::read(&self.path).map_err(|source| ApiError::Video {
            path: self.path.clone(),
            source,
        })
    }
}
