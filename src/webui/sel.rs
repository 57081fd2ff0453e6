//! Selector helpers producing Playwright selector strings

pub struct Sel;

impl Sel {
    pub fn css(selector: &str) -> String {
        selector.to_string()
    }

    /// Match on the `id` attribute
    pub fn id(id: &str) -> String {
        format!("id={}", id)
    }

    /// Match on the `name` attribute
    pub fn name(name: &str) -> String {
        format!("[name=\"{}\"]", name.replace('"', "\\\""))
    }

    pub fn xpath(expression: &str) -> String {
        format!("xpath={}", expression)
    }

    /// `child` searched inside the first match of `scope`
    pub fn in_scope(scope: &str, child: &str) -> String {
        format!("{} >> {}", scope, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(Sel::css("#tbodyid .card"), "#tbodyid .card");
        assert_eq!(Sel::id("loginusername"), "id=loginusername");
        assert_eq!(Sel::name("q"), "[name=\"q\"]");
        assert_eq!(Sel::xpath("//a[text()='Cart']"), "xpath=//a[text()='Cart']");
        assert_eq!(
            Sel::in_scope("#navbarExample", Sel::id("cartur").as_str()),
            "#navbarExample >> id=cartur"
        );
    }
}
