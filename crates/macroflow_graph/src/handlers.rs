//! Per-type node executors.
//!
//! [`NodeRunner::run`] dispatches on [`NodeKind`] with an exhaustive match.
//! Every handler returns `Result<NodeOutcome, NodeFailure>`; the runner logs
//! failures and folds them into a plain unsuccessful outcome, so nothing a
//! node does can stop the walk.

use core::time::Duration;

use macroflow_adapters::scaling::scale_point;
use macroflow_adapters::{
    ActuationError, Actuator, BBox, ColorRange, ColorSearch, DetectionSnapshot, MouseButton,
    VisionError,
};

use crate::context::ExecutionContext;
use crate::control::Cancellation;
use crate::node::{Node, NodeId, NodeKind};
use crate::params::{ParamError, Params};

/// Default `seconds` of a sleep node.
const DEFAULT_SLEEP_SECS: f64 = 0.2;
/// Default `confidence` threshold of a `find_image` node.
const DEFAULT_IMAGE_CONFIDENCE: f64 = 0.8;
/// Half side of the sampled square when `radius` is not positive.
const DEFAULT_VERIFY_RADIUS: i32 = 5;

/// Result of one node execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct NodeOutcome {
    /// Whether the node succeeded.
    pub ok: bool,
    /// Explicit successor, overriding the default connection.
    pub next: Option<NodeId>,
}

impl NodeOutcome {
    fn success() -> Self {
        Self {
            ok: true,
            next: None,
        }
    }

    fn from_bool(ok: bool) -> Self {
        Self { ok, next: None }
    }

    fn routed(ok: bool, next: Option<NodeId>) -> Self {
        Self { ok, next }
    }
}

/// Why a node did not succeed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum NodeFailure {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Actuation(#[from] ActuationError),

    #[error("snapshot has no frame")]
    NoFrame,

    #[error("no detection labeled '{0}'")]
    NoDetection(String),

    #[error("template_name is empty")]
    EmptyTemplate,

    #[error("no color range in parameters")]
    NoColorRange,

    #[error("unsupported {param} '{value}'")]
    Unsupported { param: &'static str, value: String },

    #[error("anchor ({x}, {y}) lies outside the frame")]
    OutOfBounds { x: i32, y: i32 },

    #[error("cancelled")]
    Cancelled,
}

/// Reads the color range of a node: `hsv_min`/`hsv_max` when both are set,
/// else `bgr_min`/`bgr_max`.
pub(crate) fn color_range(params: &Params) -> Result<ColorRange, NodeFailure> {
    if let (Some(min), Some(max)) = (params.color_triplet("hsv_min")?, params.color_triplet("hsv_max")?) {
        return Ok(ColorRange::Hsv { min, max });
    }
    if let (Some(min), Some(max)) = (params.color_triplet("bgr_min")?, params.color_triplet("bgr_max")?) {
        return Ok(ColorRange::Bgr { min, max });
    }
    Err(NodeFailure::NoColorRange)
}

/// Executes nodes against the engine's adapters.
pub(crate) struct NodeRunner<'a> {
    pub actuator: &'a dyn Actuator,
    pub colors: &'a dyn ColorSearch,
    pub scale_factor: f64,
    pub sleep_slice: Duration,
    pub cancel: &'a Cancellation,
}

impl NodeRunner<'_> {
    /// Runs one node. Never fails: problems become `ok == false` with no override.
    pub async fn run(
        &self,
        node: &Node,
        snapshot: &DetectionSnapshot,
        ctx: &mut ExecutionContext,
    ) -> NodeOutcome {
        let params = &node.params;
        let result = match node.kind {
            NodeKind::Sleep => self.sleep(params).await,
            NodeKind::Key => self.key(params),
            NodeKind::Click => self.click(params, snapshot),
            NodeKind::FindColor => self.find_color(params, snapshot),
            NodeKind::FindImage => find_image(params, snapshot),
            NodeKind::VerifyImageColor => self.verify_image_color(params, snapshot),
            NodeKind::Condition => self.condition(params, snapshot),
            NodeKind::Loop => run_loop(&node.id, params, ctx),
        };
        match result {
            Ok(outcome) => outcome,
            Err(NodeFailure::Cancelled) => {
                tracing::debug!(node = %node.id, kind = %node.kind, "node interrupted by cancellation");
                NodeOutcome::default()
            }
            Err(err) => {
                tracing::debug!(node = %node.id, kind = %node.kind, error = %err, "node failed");
                NodeOutcome::default()
            }
        }
    }

    fn check_cancel(&self) -> Result<(), NodeFailure> {
        if self.cancel.is_cancelled() {
            Err(NodeFailure::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Waits in slices, checking cancellation before each one.
    pub async fn sleep_for(&self, seconds: f64) -> Result<(), NodeFailure> {
        let slice = self.sleep_slice.as_secs_f64();
        let mut elapsed = 0.0;
        while elapsed < seconds {
            self.check_cancel()?;
            let chunk = slice.min(seconds - elapsed);
            tokio::time::sleep(Duration::from_secs_f64(chunk)).await;
            elapsed += chunk;
        }
        Ok(())
    }

    /// Moves to the scaled center of `bbox` and clicks.
    pub fn click_bbox(&self, bbox: BBox, params: &Params) -> Result<(), NodeFailure> {
        let button: MouseButton = params.string_or("button", "left")?.parse()?;
        let duration = Duration::try_from_secs_f64(params.f64_or("duration", 0.0)?).unwrap_or_default();
        let (cx, cy) = bbox.center();
        let (x, y) = scale_point(cx, cy, self.scale_factor);
        self.actuator.move_to(x, y, duration)?;
        self.actuator.click(button)?;
        Ok(())
    }

    async fn sleep(&self, params: &Params) -> Result<NodeOutcome, NodeFailure> {
        let seconds = params.f64_or("seconds", DEFAULT_SLEEP_SECS)?;
        self.sleep_for(seconds).await?;
        Ok(NodeOutcome::success())
    }

    fn key(&self, params: &Params) -> Result<NodeOutcome, NodeFailure> {
        self.check_cancel()?;
        let key = params.string_or("key", "space")?;
        self.actuator.press_key(&key)?;
        self.check_cancel()?;
        Ok(NodeOutcome::success())
    }

    fn click(&self, params: &Params, snapshot: &DetectionSnapshot) -> Result<NodeOutcome, NodeFailure> {
        let mode = params.string_or("mode", "label")?;
        if mode != "label" {
            return Err(NodeFailure::Unsupported {
                param: "mode",
                value: mode,
            });
        }
        let label = params.string_or("label", "")?;
        let detection = snapshot
            .find_label(&label)
            .ok_or(NodeFailure::NoDetection(label))?;
        self.click_bbox(detection.bbox, params)?;
        Ok(NodeOutcome::success())
    }

    fn find_color(&self, params: &Params, snapshot: &DetectionSnapshot) -> Result<NodeOutcome, NodeFailure> {
        self.check_cancel()?;
        let frame = snapshot.frame.as_ref().ok_or(NodeFailure::NoFrame)?;
        let range = color_range(params)?;
        let regions = self.colors.find_color(frame, &range)?;
        self.check_cancel()?;
        Ok(NodeOutcome::from_bool(!regions.is_empty()))
    }

    pub fn verify_image_color(
        &self,
        params: &Params,
        snapshot: &DetectionSnapshot,
    ) -> Result<NodeOutcome, NodeFailure> {
        self.check_cancel()?;
        let template = params.string_or("template_name", "")?;
        let offset_x = params.i32_or("offset_x", 0)?;
        let offset_y = params.i32_or("offset_y", 0)?;
        let radius = params.f64_or("radius", 0.0)?;
        if template.is_empty() {
            return Err(NodeFailure::EmptyTemplate);
        }

        let detection = snapshot
            .find_label(&template)
            .ok_or(NodeFailure::NoDetection(template))?;
        let (cx, cy) = detection.bbox.pixel_center();
        let (x, y) = (cx.saturating_add(offset_x), cy.saturating_add(offset_y));

        let frame = snapshot.frame.as_ref().ok_or(NodeFailure::NoFrame)?;
        if !frame.contains(x, y) {
            return Err(NodeFailure::OutOfBounds { x, y });
        }

        let half = if radius > 0.0 {
            (radius as i32).max(1)
        } else {
            DEFAULT_VERIFY_RADIUS
        };
        let roi = frame.crop(BBox::new(
            x.saturating_sub(half),
            y.saturating_sub(half),
            x.saturating_add(half),
            y.saturating_add(half),
        ))?;
        let range = color_range(params)?;

        self.check_cancel()?;
        let regions = self.colors.find_color(&roi, &range)?;
        self.check_cancel()?;
        Ok(NodeOutcome::from_bool(!regions.is_empty()))
    }

    fn condition(&self, params: &Params, snapshot: &DetectionSnapshot) -> Result<NodeOutcome, NodeFailure> {
        let mode = params.string_or("mode", "label")?;
        let result = match mode.as_str() {
            "label" => {
                let label = params.string_or("label", "")?;
                let min_confidence = params.f64_or("min_confidence", 0.0)?;
                snapshot
                    .find_label(&label)
                    .is_some_and(|d| d.confidence >= min_confidence)
            }
            "color" => {
                self.check_cancel()?;
                match snapshot.frame.as_ref() {
                    Some(frame) => {
                        let range = color_range(params)?;
                        let regions = self.colors.find_color(frame, &range)?;
                        self.check_cancel()?;
                        !regions.is_empty()
                    }
                    None => false,
                }
            }
            other => {
                tracing::debug!(mode = other, "unknown condition mode evaluates to false");
                false
            }
        };
        let branch = if result { "next_true" } else { "next_false" };
        Ok(NodeOutcome::routed(result, params.node_ref(branch)))
    }
}

fn find_image(params: &Params, snapshot: &DetectionSnapshot) -> Result<NodeOutcome, NodeFailure> {
    let template = params.string_or("template_name", "")?;
    let threshold = params.f64_or("confidence", DEFAULT_IMAGE_CONFIDENCE)?;
    if template.is_empty() {
        return Err(NodeFailure::EmptyTemplate);
    }
    Ok(NodeOutcome::from_bool(
        snapshot.has_label_above(&template, threshold),
    ))
}

fn run_loop(id: &NodeId, params: &Params, ctx: &mut ExecutionContext) -> Result<NodeOutcome, NodeFailure> {
    let count = params.i64_or("count", 0)?;
    let done = ctx.loop_counter(id);
    if done < count {
        ctx.set_loop_counter(id, done + 1);
        Ok(NodeOutcome::routed(true, params.node_ref("next_body")))
    } else {
        ctx.clear_loop_counter(id);
        Ok(NodeOutcome::routed(true, params.node_ref("next_after")))
    }
}
