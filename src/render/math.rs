//! Math passthrough for client-side rendering.
//!
//! Equations are emitted as LaTeX between `\(..\)` or `\[..\]` delimiters and
//! typeset in the browser, which also resolves `\eqref` and `\label`.

/// Client-side math typesetting library loaded by standalone documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MathBackend {
    /// MathJax 3; supports `\eqref` and `\newcommand` in the macro preamble.
    #[default]
    MathJax,
    /// KaTeX with the auto-render extension.
    KaTeX,
}

impl MathBackend {
    /// Scripts and styles to put in the document head.
    pub fn head_content(self) -> &'static str {
        match self {
            MathBackend::MathJax => MATHJAX_HEAD,
            MathBackend::KaTeX => KATEX_HEAD,
        }
    }
}

/// Inline math: `\(latex\)`.
pub fn render_inline(latex: &str) -> String {
    format!("\\({}\\)", escape_math(latex))
}

/// Display math: `\[latex\]`.
pub fn render_display(latex: &str) -> String {
    format!("\\[{}\\]", escape_math(latex))
}

fn escape_math(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const KATEX_HEAD: &str = r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/katex.min.css" crossorigin="anonymous">
<script defer src="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/katex.min.js" crossorigin="anonymous"></script>
<script defer src="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/contrib/auto-render.min.js" crossorigin="anonymous"
    onload="renderMathInElement(document.body, {
        delimiters: [
            {left: '\\[', right: '\\]', display: true},
            {left: '\\(', right: '\\)', display: false}
        ],
        trust: true
    });"></script>"#;

const MATHJAX_HEAD: &str = r#"<script>
MathJax = {
    tex: {
        inlineMath: [['\\(', '\\)']],
        displayMath: [['\\[', '\\]']],
        tags: 'ams'
    }
};
</script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>"#;
