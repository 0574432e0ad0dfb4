//! Interactive 3D scatter of the cluster projection (Plotly.js)
//!
//! With `PlotlyScript::Cdn` the page loads Plotly.js over the network when
//! opened. `PlotlyScript::Inline` embeds a local bundle so the page works
//! offline.

use serde_json::{json, Value};

use biblio_common::models::Clusters;
use biblio_common::Result;

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Where the page gets Plotly.js from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotlyScript {
    /// Script tag pointing at a URL
    Cdn(String),
    /// Source of plotly.min.js, embedded in the page
    Inline(String),
}

impl Default for PlotlyScript {
    fn default() -> Self {
        PlotlyScript::Cdn(PLOTLY_CDN.to_string())
    }
}

impl PlotlyScript {
    fn tag(&self) -> String {
        match self {
            PlotlyScript::Cdn(url) => format!("<script src=\"{}\"></script>", url.replace('"', "%22")),
            PlotlyScript::Inline(source) => {
                format!("<script>\n{}\n</script>", source.replace("</script", "<\\/script"))
            }
        }
    }
}

/// CSS named colors in alphabetical order, assigned to clusters in turn
pub const CSS_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver", "skyblue",
    "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan", "teal",
    "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke", "yellow",
    "yellowgreen",
];

/// Standalone HTML page plotting every non-noise cluster as its own trace
///
/// Missing projected coordinates are plotted at zero.
pub fn scatter_html(clusters: &Clusters, plotly: &PlotlyScript) -> Result<String> {
    let traces: Vec<Value> = clusters
        .non_noise()
        .zip(CSS_COLORS.iter().cycle())
        .map(|(cluster, color)| {
            let axis = |d: usize| -> Vec<f64> {
                cluster
                    .points
                    .iter()
                    .map(|p| p.projected.get(d).copied().unwrap_or(0.0))
                    .collect()
            };
            json!({
                "type": "scatter3d",
                "mode": "markers",
                "name": cluster.name,
                "x": axis(0),
                "y": axis(1),
                "z": axis(2),
                "text": cluster.points.iter().map(|p| p.paper_id.as_str()).collect::<Vec<_>>(),
                "marker": {
                    "size": 5,
                    "line": { "width": 0.5 },
                    "opacity": 0.8,
                    "color": color,
                },
            })
        })
        .collect();

    let layout = json!({ "margin": { "l": 0, "r": 0, "t": 0, "b": 0 } });

    // "</" inside the inline script would end it early
    let traces = serde_json::to_string(&traces)?.replace("</", "<\\/");
    let layout = serde_json::to_string(&layout)?;
    let plotly = plotly.tag();

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
{plotly}
</head>
<body>
<div id="clusters" style="width:100%;height:100vh;"></div>
<script>
Plotly.newPlot("clusters", {traces}, {layout});
</script>
</body>
</html>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_common::models::{Cluster, Point};
    use biblio_common::NOISE_CLUSTER;

    fn point(id: &str, xyz: [f64; 3]) -> Point {
        Point {
            paper_id: id.to_string(),
            embedding: vec![0.0],
            projected: xyz.to_vec(),
            index: 0,
        }
    }

    fn clusters() -> Clusters {
        let mut noise = Cluster::new(NOISE_CLUSTER, vec![point("n", [9.0, 9.0, 9.0])]);
        noise.name = "Noise".to_string();
        let mut first = Cluster::new(0, vec![point("a", [1.0, 2.0, 3.0]), point("b", [4.0, 5.0, 6.0])]);
        first.name = "Plague </script> Genomics".to_string();
        let mut second = Cluster::new(1, vec![point("c", [0.5, 0.5, 0.5])]);
        second.name = "Ricin".to_string();

        Clusters {
            clusters: [(NOISE_CLUSTER, noise), (0, first), (1, second)].into_iter().collect(),
        }
    }

    fn traces(html: &str) -> Vec<Value> {
        let start = html.find("Plotly.newPlot(\"clusters\", ").unwrap() + "Plotly.newPlot(\"clusters\", ".len();
        let mut de = serde_json::Deserializer::from_str(&html[start..]).into_iter::<Value>();
        serde_json::from_value(de.next().unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_one_trace_per_clustered_group() {
        let html = scatter_html(&clusters(), &PlotlyScript::default()).unwrap();
        let traces = traces(&html);

        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["type"], "scatter3d");
        assert_eq!(traces[0]["x"], json!([1.0, 4.0]));
        assert_eq!(traces[0]["z"], json!([3.0, 6.0]));
        assert_eq!(traces[0]["marker"]["color"], "aliceblue");
        assert_eq!(traces[0]["marker"]["size"], 5);
        assert_eq!(traces[1]["name"], "Ricin");
        assert_eq!(traces[1]["marker"]["color"], "antiquewhite");
    }

    #[test]
    fn test_labels_cannot_close_script() {
        let html = scatter_html(&clusters(), &PlotlyScript::default()).unwrap();
        assert!(!html.contains("Plague </script>"));
        assert_eq!(traces(&html)[0]["name"], "Plague </script> Genomics");
    }

    #[test]
    fn test_cdn_page_needs_network() {
        let html = scatter_html(&clusters(), &PlotlyScript::default()).unwrap();
        assert!(html.contains(&format!("<script src=\"{PLOTLY_CDN}\"></script>")));
    }

    #[test]
    fn test_inline_bundle_works_offline() {
        let bundle = PlotlyScript::Inline("window.Plotly = {}; var tag = \"</script>\";".to_string());
        let html = scatter_html(&clusters(), &bundle).unwrap();

        assert!(!html.contains("cdn.plot.ly"));
        assert!(html.contains("window.Plotly = {};"));
        assert!(html.contains("var tag = \"<\\/script>\";"));
        assert_eq!(traces(&html).len(), 2);
    }

    #[test]
    fn test_palette_size() {
        assert_eq!(CSS_COLORS.len(), 148);
    }
}
