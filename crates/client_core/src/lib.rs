//! Client side of the LED tree controller: geometry reconstruction for
//! rendering, plus HTTP and WebSocket access to a running controller.

mod client;
pub mod geometry;

pub use client::{parse_frame, ClientError, FrameStream, LedClient};
pub use geometry::{
    BranchGeometry, CanvasGeometry, GeometryError, GridPoint, PlacedPixel, Reconstructor, Scene,
    Segment,
};
