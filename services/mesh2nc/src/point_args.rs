//! Query point arguments.

use anyhow::{bail, Context, Result};
use mesh_common::point::point_key;
use mesh_common::{Point, QueryPoints};

/// Parse `name=x,y,z` or `x,y,z` arguments; unnamed points get `pt{index}`.
pub fn parse_query_points(args: &[String]) -> Result<QueryPoints> {
    let mut points = QueryPoints::new();

    for (i, arg) in args.iter().enumerate() {
        let (name, coords) = match arg.split_once('=') {
            Some((name, coords)) => (name.trim().to_string(), coords),
            None => (point_key(i), arg.as_str()),
        };
        let point = Point::parse(coords).with_context(|| format!("Invalid point '{}'", arg))?;

        if points.insert(name.clone(), point).is_some() {
            bail!("Point '{}' given more than once", name);
        }
    }

    Ok(points)
}
