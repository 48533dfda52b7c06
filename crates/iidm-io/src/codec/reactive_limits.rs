//! `minMaxReactiveLimits` and `reactiveCapabilityCurve` children of generator-like injections.

use iidm_core::{IidmResult, ReactiveCapabilityPoint, ReactiveLimits};

use crate::context::{ReaderContext, WriterContext};

pub(crate) const MIN_MAX: &str = "minMaxReactiveLimits";
pub(crate) const CURVE: &str = "reactiveCapabilityCurve";
const POINT: &str = "point";

pub(crate) fn write(ctx: &mut WriterContext<'_>, limits: Option<&ReactiveLimits>) -> IidmResult<()> {
    match limits {
        None => Ok(()),
        Some(ReactiveLimits::MinMax { min_q, max_q }) => {
            ctx.start(MIN_MAX)?;
            ctx.writer.write_double_attribute("minQ", *min_q)?;
            ctx.writer.write_double_attribute("maxQ", *max_q)?;
            ctx.end()
        }
        Some(ReactiveLimits::Curve(points)) => {
            ctx.start(CURVE)?;
            for point in points {
                ctx.start(POINT)?;
                ctx.writer.write_double_attribute("p", point.p)?;
                ctx.writer.write_double_attribute("minQ", point.min_q)?;
                ctx.writer.write_double_attribute("maxQ", point.max_q)?;
                ctx.end()?;
            }
            ctx.end()
        }
    }
}

/// Read the reactive limits child `element`; `None` when the name is not a reactive
/// limits element.
pub(crate) fn read(ctx: &mut ReaderContext<'_>, element: &str) -> IidmResult<Option<ReactiveLimits>> {
    match element {
        MIN_MAX => {
            let min_q = ctx.reader.read_double_or("minQ", -f64::MAX)?;
            let max_q = ctx.reader.read_double_or("maxQ", f64::MAX)?;
            ctx.reader.read_end_node(MIN_MAX)?;
            Ok(Some(ReactiveLimits::MinMax { min_q, max_q }))
        }
        CURVE => {
            let mut points = Vec::new();
            while let Some(child) = ctx.reader.next_child()? {
                if child != POINT {
                    return Err(iidm_core::IidmError::UnknownElement {
                        element: child,
                        parent: CURVE.to_string(),
                    });
                }
                points.push(ReactiveCapabilityPoint {
                    p: ctx.reader.read_double("p")?,
                    min_q: ctx.reader.read_double("minQ")?,
                    max_q: ctx.reader.read_double("maxQ")?,
                });
                ctx.reader.read_end_node(POINT)?;
            }
            ReactiveLimits::curve(points).map(Some)
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::reader_over;
    use crate::extensions::ExtensionRegistry;
    use crate::options::ImportOptions;
    use crate::tree::TreeDataFormat;
    use crate::version::IidmVersion;

    #[test]
    fn test_curve_points_sorted_on_read() {
        let json = r#"{"version":"1.12","reactiveCapabilityCurve":{"points":[
            {"p":100.0,"minQ":-50.0,"maxQ":50.0},
            {"p":0.0,"minQ":-80.0,"maxQ":80.0}]}}"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(json, TreeDataFormat::Json, IidmVersion::CURRENT, &options, &registry);
        let element = ctx.reader.next_child().expect("child").expect("curve");
        let limits = read(&mut ctx, &element).expect("read").expect("limits");
        match limits {
            ReactiveLimits::Curve(points) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].p, 0.0);
                assert_eq!(points[1].max_q, 50.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_single_point_curve_rejected() {
        let xml = r#"<g xmlns="urn:x"><reactiveCapabilityCurve><point p="0" minQ="-1" maxQ="1"/></reactiveCapabilityCurve></g>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        let element = ctx.reader.next_child().expect("child").expect("curve");
        assert!(read(&mut ctx, &element).is_err());
    }
}
