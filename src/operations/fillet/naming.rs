/// Face names of one fillet tool.
///
/// Cleanup and manifold enforcement match on these suffixes, so they are a
/// contract with [`FaceRole::from_name`](crate::operations::repair::FaceRole::from_name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceNames {
    pub base: String,
    pub arc: String,
    pub side_a: String,
    pub side_b: String,
    pub cap_start: String,
    pub cap_end: String,
    pub tube_outer: String,
    pub tube_inner: String,
    pub tube_cap_start: String,
    pub tube_cap_end: String,
}

impl FaceNames {
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_owned(),
            arc: format!("{base}_ARC"),
            side_a: format!("{base}_SIDE_A"),
            side_b: format!("{base}_SIDE_B"),
            cap_start: format!("{base}_CAP_START"),
            cap_end: format!("{base}_CAP_END"),
            tube_outer: format!("{base}_TUBE_Outer"),
            tube_inner: format!("{base}_TUBE_Inner"),
            tube_cap_start: format!("{base}_TUBE_CapStart"),
            tube_cap_end: format!("{base}_TUBE_CapEnd"),
        }
    }

    /// Names of the faces of a ring-lofted tool.
    #[must_use]
    pub fn wedge_faces(&self) -> [&str; 5] {
        [&self.arc, &self.side_a, &self.side_b, &self.cap_start, &self.cap_end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::repair::FaceRole;

    #[test]
    fn roles_follow_the_naming_convention() {
        let names = FaceNames::new("F1");
        assert_eq!(FaceRole::from_name(&names.arc), FaceRole::Arc);
        assert_eq!(FaceRole::from_name(&names.tube_outer), FaceRole::Arc);
        assert_eq!(FaceRole::from_name(&names.tube_inner), FaceRole::Arc);
        assert_eq!(FaceRole::from_name(&names.cap_start), FaceRole::Cap);
        assert_eq!(FaceRole::from_name(&names.tube_cap_end), FaceRole::Cap);
        assert_eq!(FaceRole::from_name(&names.side_b), FaceRole::Side);
        assert_eq!(names.side_a, "F1_SIDE_A");
    }
}
