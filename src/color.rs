//! Color descriptors → normalized RGB for the shader.
//!
//! Accepts hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), `rgb()`/`rgba()`,
//! `hsl()`/`hsla()`, bare theme triplets (`222.2 84% 4.9%`), common named
//! colors and custom-property references (`var(--token, fallback)` or a bare
//! `--token`). References may also sit inside a function, as in
//! `hsl(var(--primary))`. Alpha is parsed but dropped; the shader works in RGB.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1, take_while_m_n},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, recognize, rest, verify},
    multi::separated_list1,
    number::complete::float,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::ColorResolutionError;
use crate::host::StyleSource;

/// Custom properties may reference each other; stop following after this many hops.
const MAX_PROPERTY_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Resolves color descriptors, following custom properties through `style`.
pub struct ColorResolver<'a> {
    style: &'a dyn StyleSource,
}

impl<'a> ColorResolver<'a> {
    pub fn new(style: &'a dyn StyleSource) -> Self {
        Self { style }
    }

    /// Resolve `descriptor`, substituting opaque black for anything unusable.
    pub fn resolve(&self, descriptor: &str) -> Rgb {
        match self.try_resolve(descriptor) {
            Ok(rgb) => rgb,
            Err(err) => {
                log::warn!("color fallback to black: {err}");
                Rgb::BLACK
            }
        }
    }

    pub fn try_resolve(&self, descriptor: &str) -> Result<Rgb, ColorResolutionError> {
        self.resolve_at(descriptor, 0)
    }

    fn resolve_at(&self, descriptor: &str, depth: usize) -> Result<Rgb, ColorResolutionError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(ColorResolutionError::Empty);
        }

        if let Some((name, fallback)) = property_reference(descriptor) {
            if depth >= MAX_PROPERTY_DEPTH {
                return Err(ColorResolutionError::TooDeep(name.to_owned()));
            }
            let value = self
                .style
                .custom_property(name)
                .filter(|value| !value.trim().is_empty());
            return match (value, fallback) {
                (Some(value), _) => self.resolve_at(&value, depth + 1),
                (None, Some(fallback)) => self.resolve_at(fallback, depth + 1),
                (None, None) => Err(ColorResolutionError::UndefinedProperty(name.to_owned())),
            };
        }

        if descriptor.contains("var(") {
            let expanded = self.expand_references(descriptor, depth)?;
            return parse_color(&expanded)
                .map(Rgb::clamped)
                .ok_or(ColorResolutionError::Unrecognised(expanded));
        }

        parse_color(descriptor)
            .map(Rgb::clamped)
            .ok_or_else(|| ColorResolutionError::Unrecognised(descriptor.to_owned()))
    }

    /// Substitute every `var(...)` inside `input` with the property's text.
    fn expand_references(
        &self,
        input: &str,
        depth: usize,
    ) -> Result<String, ColorResolutionError> {
        let mut expanded = String::with_capacity(input.len());
        let mut remaining = input;
        while let Some(start) = remaining.find("var(") {
            expanded.push_str(&remaining[..start]);
            let tail = &remaining[start..];
            let end = closing_paren(tail)
                .ok_or_else(|| ColorResolutionError::Unrecognised(input.to_owned()))?;
            let (name, fallback) = property_reference(&tail[..=end])
                .ok_or_else(|| ColorResolutionError::Unrecognised(input.to_owned()))?;
            if depth >= MAX_PROPERTY_DEPTH {
                return Err(ColorResolutionError::TooDeep(name.to_owned()));
            }
            let value = self
                .style
                .custom_property(name)
                .filter(|value| !value.trim().is_empty());
            let text = match (value, fallback) {
                (Some(value), _) => value,
                (None, Some(fallback)) => fallback.to_owned(),
                (None, None) => {
                    return Err(ColorResolutionError::UndefinedProperty(name.to_owned()))
                }
            };
            expanded.push_str(&self.expand_references(text.trim(), depth + 1)?);
            remaining = &tail[end + 1..];
        }
        expanded.push_str(remaining);
        Ok(expanded)
    }
}

/// Byte index of the `)` closing the first `(` in `input`.
fn closing_paren(input: &str) -> Option<usize> {
    let mut open = 0usize;
    for (index, c) in input.char_indices() {
        match c {
            '(' => open += 1,
            ')' => {
                open = open.checked_sub(1)?;
                if open == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `var(--name, fallback)` or `--name` into name and optional fallback.
fn property_reference(input: &str) -> Option<(&str, Option<&str>)> {
    if input.starts_with("--") {
        return Some((input, None));
    }
    let body = input
        .strip_prefix("var(")
        .or_else(|| input.strip_prefix("VAR("))?;
    if closing_paren(input)? + 1 != input.len() {
        return None;
    }
    let inner = &body[..body.len() - 1];
    let result: IResult<&str, (&str, Option<&str>)> = all_consuming(pair(
        delimited(multispace0, property_name, multispace0),
        opt(preceded(char(','), rest)),
    ))(inner);
    result
        .ok()
        .map(|(_, (name, fallback))| (name, fallback.map(str::trim)))
}

fn property_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        tag("--"),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
    ))(input)
}

fn parse_color(input: &str) -> Option<Rgb> {
    if let Ok((_, rgb)) = all_consuming(hex_color)(input) {
        return Some(rgb);
    }
    if let Ok((_, rgb)) = all_consuming(rgb_function)(input) {
        return Some(rgb);
    }
    if let Ok((_, rgb)) = all_consuming(hsl_function)(input) {
        return Some(rgb);
    }
    if let Ok((_, rgb)) = all_consuming(hsl_triplet)(input) {
        return Some(rgb);
    }
    named_color(input)
}

fn hex_color(input: &str) -> IResult<&str, Rgb> {
    let (input, digits) = preceded(
        char('#'),
        take_while_m_n(3, 8, |c: char| c.is_ascii_hexdigit()),
    )(input)?;
    let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
    let short = |c: &str| channel(&c.repeat(2));
    let rgb = match digits.len() {
        3 | 4 => Rgb::from_u8(short(&digits[0..1]), short(&digits[1..2]), short(&digits[2..3])),
        6 | 8 => Rgb::from_u8(channel(&digits[0..2]), channel(&digits[2..4]), channel(&digits[4..6])),
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )))
        }
    };
    Ok((input, rgb))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Unit {
    Number,
    Percent,
    Degrees,
}

#[derive(Clone, Copy, Debug)]
struct Component {
    value: f32,
    unit: Unit,
}

fn component(input: &str) -> IResult<&str, Component> {
    map(
        pair(
            verify(float, |value: &f32| value.is_finite()),
            opt(alt((
                map(char('%'), |_| Unit::Percent),
                map(tag_no_case("deg"), |_| Unit::Degrees),
            ))),
        ),
        |(value, unit)| Component {
            value,
            unit: unit.unwrap_or(Unit::Number),
        },
    )(input)
}

/// Accepts both the legacy comma syntax and the space/slash syntax.
fn separator(input: &str) -> IResult<&str, ()> {
    alt((
        map(
            tuple((multispace0, alt((char(','), char('/'))), multispace0)),
            |_| (),
        ),
        map(multispace1, |_| ()),
    ))(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Component>> {
    delimited(
        terminated(char('('), multispace0),
        separated_list1(separator, component),
        preceded(multispace0, char(')')),
    )(input)
}

fn rgb_function(input: &str) -> IResult<&str, Rgb> {
    let (input, _) = terminated(
        pair(tag_no_case("rgb"), opt(tag_no_case("a"))),
        multispace0,
    )(input)?;
    let (input, args) = arguments(input)?;
    match args.as_slice() {
        [r, g, b] | [r, g, b, _] => {
            let channel = |c: &Component| match c.unit {
                Unit::Percent => c.value / 100.0,
                _ => c.value / 255.0,
            };
            Ok((input, Rgb::new(channel(r), channel(g), channel(b))))
        }
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Count,
        ))),
    }
}

fn hsl_function(input: &str) -> IResult<&str, Rgb> {
    let (input, _) = terminated(
        pair(tag_no_case("hsl"), opt(tag_no_case("a"))),
        multispace0,
    )(input)?;
    let (input, args) = arguments(input)?;
    match args.as_slice() {
        [h, s, l] | [h, s, l, _] => Ok((input, hsl_to_rgb(h.value, percent(s), percent(l)))),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Count,
        ))),
    }
}

/// `222.2 84% 4.9%`: the form theme tokens are commonly stored in so they can
/// be wrapped in `hsl(var(--token))` by stylesheets.
fn hsl_triplet(input: &str) -> IResult<&str, Rgb> {
    let (input, (h, _, s, _, l)) =
        tuple((component, multispace1, component, multispace1, component))(input)?;
    if s.unit != Unit::Percent || l.unit != Unit::Percent {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((input, hsl_to_rgb(h.value, percent(&s), percent(&l))))
}

fn percent(c: &Component) -> f32 {
    match c.unit {
        Unit::Percent => c.value / 100.0,
        _ => c.value,
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let h = hue.rem_euclid(360.0) / 360.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);
    if s == 0.0 {
        return Rgb::new(l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    Rgb::new(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn named_color(name: &str) -> Option<Rgb> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "black" | "transparent" => Rgb::from_u8(0, 0, 0),
        "white" => Rgb::from_u8(255, 255, 255),
        "red" => Rgb::from_u8(255, 0, 0),
        "green" => Rgb::from_u8(0, 128, 0),
        "lime" => Rgb::from_u8(0, 255, 0),
        "blue" => Rgb::from_u8(0, 0, 255),
        "yellow" => Rgb::from_u8(255, 255, 0),
        "cyan" | "aqua" => Rgb::from_u8(0, 255, 255),
        "magenta" | "fuchsia" => Rgb::from_u8(255, 0, 255),
        "gray" | "grey" => Rgb::from_u8(128, 128, 128),
        "silver" => Rgb::from_u8(192, 192, 192),
        "maroon" => Rgb::from_u8(128, 0, 0),
        "olive" => Rgb::from_u8(128, 128, 0),
        "navy" => Rgb::from_u8(0, 0, 128),
        "teal" => Rgb::from_u8(0, 128, 128),
        "purple" => Rgb::from_u8(128, 0, 128),
        "orange" => Rgb::from_u8(255, 165, 0),
        "pink" => Rgb::from_u8(255, 192, 203),
        "hotpink" => Rgb::from_u8(255, 105, 180),
        "gold" => Rgb::from_u8(255, 215, 0),
        "indigo" => Rgb::from_u8(75, 0, 130),
        "violet" => Rgb::from_u8(238, 130, 238),
        "coral" => Rgb::from_u8(255, 127, 80),
        "crimson" => Rgb::from_u8(220, 20, 60),
        "turquoise" => Rgb::from_u8(64, 224, 208),
        "skyblue" => Rgb::from_u8(135, 206, 235),
        "royalblue" => Rgb::from_u8(65, 105, 225),
        "dodgerblue" => Rgb::from_u8(30, 144, 255),
        "slategray" | "slategrey" => Rgb::from_u8(112, 128, 144),
        _ => return None,
    };
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Props(HashMap<&'static str, &'static str>);

    impl StyleSource for Props {
        fn custom_property(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| v.to_string())
        }
    }

    fn approx(a: Rgb, b: Rgb) -> bool {
        (a.r - b.r).abs() < 1e-3 && (a.g - b.g).abs() < 1e-3 && (a.b - b.b).abs() < 1e-3
    }

    #[test]
    fn hex_forms() {
        let r = ColorResolver::new(&());
        assert_eq!(r.try_resolve("#ff0000"), Ok(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(r.try_resolve("#0f0"), Ok(Rgb::new(0.0, 1.0, 0.0)));
        assert_eq!(r.try_resolve("#0000ff80"), Ok(Rgb::new(0.0, 0.0, 1.0)));
        assert_eq!(r.try_resolve("#fff8"), Ok(Rgb::new(1.0, 1.0, 1.0)));
        assert!(r.try_resolve("#12345").is_err());
        assert!(r.try_resolve("#ggg").is_err());
    }

    #[test]
    fn functional_forms() {
        let r = ColorResolver::new(&());
        assert_eq!(r.try_resolve("rgb(255, 0, 0)"), Ok(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(r.try_resolve("rgba(0 255 0 / 0.5)"), Ok(Rgb::new(0.0, 1.0, 0.0)));
        assert_eq!(r.try_resolve("rgb(100%, 0%, 50%)"), Ok(Rgb::new(1.0, 0.0, 0.5)));
        assert!(approx(r.try_resolve("hsl(120, 100%, 50%)").unwrap(), Rgb::new(0.0, 1.0, 0.0)));
        assert!(approx(r.try_resolve("hsl(240deg 100% 50%)").unwrap(), Rgb::new(0.0, 0.0, 1.0)));
        assert!(r.try_resolve("rgb(1, 2)").is_err());
    }

    #[test]
    fn out_of_range_channels_clamp() {
        let r = ColorResolver::new(&());
        assert_eq!(r.try_resolve("rgb(300, -5, 0)"), Ok(Rgb::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn named_colors_ignore_case() {
        let r = ColorResolver::new(&());
        assert_eq!(r.try_resolve("White"), Ok(Rgb::new(1.0, 1.0, 1.0)));
        assert!(r.try_resolve("notacolor").is_err());
    }

    #[test]
    fn custom_properties_follow_references() {
        let props = Props(HashMap::from([
            ("--primary", "var(--brand)"),
            ("--brand", " #ff0000 "),
            ("--muted", "0 0% 50%"),
            ("--loop", "var(--loop)"),
        ]));
        let r = ColorResolver::new(&props);
        assert_eq!(r.try_resolve("var(--primary)"), Ok(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(r.try_resolve("--brand"), Ok(Rgb::new(1.0, 0.0, 0.0)));
        assert!(approx(r.try_resolve("--muted").unwrap(), Rgb::new(0.5, 0.5, 0.5)));
        assert_eq!(r.try_resolve("var(--missing, blue)"), Ok(Rgb::new(0.0, 0.0, 1.0)));
        assert_eq!(
            r.try_resolve("var(--missing, var(--brand))"),
            Ok(Rgb::new(1.0, 0.0, 0.0))
        );
        assert_eq!(
            r.try_resolve("var(--missing)"),
            Err(ColorResolutionError::UndefinedProperty("--missing".into()))
        );
        assert!(matches!(
            r.try_resolve("--loop"),
            Err(ColorResolutionError::TooDeep(_))
        ));
    }

    #[test]
    fn references_inside_functions_are_substituted() {
        let props = Props(HashMap::from([
            ("--primary", "217 91% 60%"),
            ("--hue", "var(--base-hue)"),
            ("--base-hue", "120"),
            ("--loop", "hsl(var(--loop))"),
        ]));
        let r = ColorResolver::new(&props);
        let bare = r.try_resolve("var(--primary)").unwrap();
        assert!(approx(r.try_resolve("hsl(var(--primary))").unwrap(), bare));
        assert!(approx(r.try_resolve("hsl(var(--primary) / 0.5)").unwrap(), bare));
        assert!(approx(
            r.try_resolve("hsl(var(--hue), 100%, 50%)").unwrap(),
            Rgb::new(0.0, 1.0, 0.0)
        ));
        assert!(approx(
            r.try_resolve("hsl(var(--missing, 240) 100% 50%)").unwrap(),
            Rgb::new(0.0, 0.0, 1.0)
        ));
        assert_eq!(
            r.try_resolve("rgb(var(--missing))"),
            Err(ColorResolutionError::UndefinedProperty("--missing".into()))
        );
        assert!(matches!(
            r.try_resolve("--loop"),
            Err(ColorResolutionError::TooDeep(_))
        ));
        assert!(r.try_resolve("hsl(var(--primary)").is_err());
    }

    #[test]
    fn non_finite_components_are_rejected() {
        let r = ColorResolver::new(&());
        for descriptor in [
            "rgb(nan, 0, 0)",
            "rgb(0, inf, 0)",
            "hsl(nan, 50%, 50%)",
            "hsla(120, infinity%, 50%, 1)",
            "nan 0% 50%",
        ] {
            assert!(
                matches!(
                    r.try_resolve(descriptor),
                    Err(ColorResolutionError::Unrecognised(_))
                ),
                "{descriptor}"
            );
            assert_eq!(r.resolve(descriptor), Rgb::BLACK);
        }
    }

    #[test]
    fn failures_fall_back_to_black() {
        let r = ColorResolver::new(&());
        assert_eq!(r.resolve(""), Rgb::BLACK);
        assert_eq!(r.resolve("var(--nope)"), Rgb::BLACK);
        assert_eq!(r.resolve("#zzzzzz"), Rgb::BLACK);
    }
}
