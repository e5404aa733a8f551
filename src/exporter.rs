//! Constant export: renamed constants with their native values, untouched.

use crate::catalog::Radix;
use crate::resolver::BindingSurface;

/// A renamed constant ready for emission. `value` is the native value as
/// loaded; no arithmetic is ever applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedConstant {
    pub target: String,
    pub group: String,
    pub value: i64,
    pub radix: Radix,
}

/// Constants of one enumeration group, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantGroup {
    pub name: String,
    pub constants: Vec<ExportedConstant>,
}

impl ConstantGroup {
    /// Whether every member fits a C `int` / Rust `i32`.
    pub fn fits_i32(&self) -> bool {
        self.constants.iter().all(|c| i32::try_from(c.value).is_ok())
    }
}

/// Every constant of the surface in catalog discovery order.
pub fn export(surface: &BindingSurface) -> Vec<ExportedConstant> {
    surface
        .constants()
        .map(|(target, constant)| ExportedConstant {
            target: target.to_string(),
            group: constant.group.clone(),
            value: constant.value,
            radix: constant.radix,
        })
        .collect()
}

/// Like [`export`], grouped by enumeration group. Groups appear in the order
/// their first member was discovered.
pub fn export_grouped(surface: &BindingSurface) -> Vec<ConstantGroup> {
    let mut groups: Vec<ConstantGroup> = Vec::new();
    for constant in export(surface) {
        match groups.iter_mut().find(|g| g.name == constant.group) {
            Some(group) => group.constants.push(constant),
            None => groups.push(ConstantGroup {
                name: constant.group.clone(),
                constants: vec![constant],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::naming::NamingRule;
    use crate::resolver::resolve;

    #[test]
    fn exports_in_discovery_order_with_exact_values() {
        let catalog = Catalog::builder()
            .add_type("ImgObsInfo", "opencv/cvaux.h")
            .add_constant("Event", "EVENT_MOUSEMOVE", 0)
            .add_constant("Event", "EVENT_LBUTTONDOWN", 1)
            .build()
            .unwrap();
        let surface = resolve(&catalog, &NamingRule::new().with_prefix_add("Cv")).unwrap();
        let pairs: Vec<_> = export(&surface).into_iter().map(|c| (c.target, c.value)).collect();
        assert_eq!(
            pairs,
            vec![("CvEVENT_MOUSEMOVE".to_string(), 0), ("CvEVENT_LBUTTONDOWN".to_string(), 1)]
        );
    }

    #[test]
    fn groups_follow_first_appearance() {
        let catalog = Catalog::builder()
            .add_constant("Event", "EVENT_MOUSEMOVE", 0)
            .add_constant("Load", "LOAD_IMAGE_UNCHANGED", -1)
            .add_constant("Event", "EVENT_FLAG_ALTKEY", 0x20)
            .add_constant("Mask", "FULL", 0xFFFF_FFFF)
            .build()
            .unwrap();
        let surface = resolve(&catalog, &NamingRule::new()).unwrap();
        let groups = export_grouped(&surface);
        let shape: Vec<_> = groups
            .iter()
            .map(|g| (g.name.as_str(), g.constants.iter().map(|c| c.target.as_str()).collect::<Vec<_>>()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("Event", vec!["EVENT_MOUSEMOVE", "EVENT_FLAG_ALTKEY"]),
                ("Load", vec!["LOAD_IMAGE_UNCHANGED"]),
                ("Mask", vec!["FULL"]),
            ]
        );
        assert!(groups[0].fits_i32());
        assert!(groups[1].fits_i32());
        assert!(!groups[2].fits_i32());
        assert_eq!(groups[2].constants[0].value, 4_294_967_295);
    }
}
