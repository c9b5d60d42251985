use tagstream_core::{Handler, Parser};

#[derive(Default)]
struct Links(Vec<String>);

impl Handler for Links {
    fn on_attribute(&mut self, name: &str, value: &str) {
        if name == "href" {
            self.0.push(value.to_string());
        }
    }
}

fn main() {
    let html = r#"
        <nav>
          <a href="/home">Home</a>
          <a href="/docs" class="active">Docs</a>
          <a href="https://example.com">Elsewhere</a>
        </nav>
    "#;

    let mut parser = Parser::new(Links::default());
    parser.write(html);
    parser.end();

    for href in parser.into_handler().0 {
        println!("{href}");
    }
}
