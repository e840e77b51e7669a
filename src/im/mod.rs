pub mod core;
#[allow(unused_imports)]
pub use core::{
    copy_land_im_to_rgba_im, label_im_to_rgba_im, Im, LabelIm, LandIm, RGBAIm,
};

pub mod roi;
#[allow(unused_imports)]
pub use roi::ROI;

pub mod label;
#[allow(unused_imports)]
pub use label::{
    enumerate_boundaries, fill_smallest_lake, label_components, label_topology, Boundary,
    ComponentInfo, Euler, Topology, UNLABELED,
};

// Optional extras
// -----------------------------------------------------------------------------

#[cfg(feature = "im-io")]
pub mod io;
