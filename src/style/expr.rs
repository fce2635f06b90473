//! Tiny arithmetic expressions for custom tick formatters.
//!
//! Grammar (usual precedence, `^` right-associative):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' unary)?
//! atom   := number | 'x' | 'pos' | 'pi' | 'e' | ident '(' expr ')' | '(' expr ')'
//! ```

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    X,
    Pos,
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Abs,
    Sqrt,
    Exp,
    Ln,
    Log10,
    Log2,
    Round,
    Floor,
    Ceil,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "log10" => Func::Log10,
            "log2" => Func::Log2,
            "round" => Func::Round,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            _ => return None,
        })
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            Func::Abs => v.abs(),
            Func::Sqrt => v.sqrt(),
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Log10 => v.log10(),
            Func::Log2 => v.log2(),
            Func::Round => v.round(),
            Func::Floor => v.floor(),
            Func::Ceil => v.ceil(),
        }
    }
}

impl Expr {
    pub fn parse(src: &str) -> Result<Expr, String> {
        let tokens = tokenize(src)?;
        let mut p = Parser { tokens, at: 0 };
        let e = p.expr()?;
        if p.at != p.tokens.len() {
            return Err(format!(
                "unexpected {:?} in expression {:?}",
                p.tokens[p.at], src
            ));
        }
        Ok(e)
    }

    pub fn eval(&self, x: f64, pos: usize) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::X => x,
            Expr::Pos => pos as f64,
            Expr::Neg(e) => -e.eval(x, pos),
            Expr::Call(f, e) => f.apply(e.eval(x, pos)),
            Expr::Bin(op, a, b) => {
                let (a, b) = (a.eval(x, pos), b.eval(x, pos));
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    '%' => a % b,
                    _ => a.powf(b),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                out.push(Tok::Open);
                i += 1;
            }
            ')' => {
                out.push(Tok::Close);
                i += 1;
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                // `**` is accepted as power.
                if c == '*' && chars.get(i + 1) == Some(&'*') {
                    out.push(Tok::Op('^'));
                    i += 2;
                } else {
                    out.push(Tok::Op(c));
                    i += 1;
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let v = text
                    .parse::<f64>()
                    .map_err(|_| format!("bad number {:?}", text))?;
                out.push(Tok::Num(v));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character {:?}", other)),
        }
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Tok>,
    at: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.at).cloned();
        self.at += 1;
        t
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        while let Some(Tok::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.at += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some(Tok::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.at += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Tok::Op('-')) => {
                self.at += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Tok::Op('+')) => {
                self.at += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.atom()?;
        if let Some(Tok::Op('^')) = self.peek().cloned() {
            self.at += 1;
            let exp = self.unary()?;
            return Ok(Expr::Bin('^', Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Tok::Num(v)) => Ok(Expr::Num(v)),
            Some(Tok::Open) => {
                let e = self.expr()?;
                match self.next() {
                    Some(Tok::Close) => Ok(e),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(Tok::Ident(name)) => match name.as_str() {
                "x" => Ok(Expr::X),
                "pos" => Ok(Expr::Pos),
                "pi" => Ok(Expr::Num(std::f64::consts::PI)),
                "e" => Ok(Expr::Num(std::f64::consts::E)),
                other => {
                    let func = Func::lookup(other)
                        .ok_or_else(|| format!("unknown name {:?}", other))?;
                    if self.next() != Some(Tok::Open) {
                        return Err(format!("expected '(' after {}", other));
                    }
                    let arg = self.expr()?;
                    if self.next() != Some(Tok::Close) {
                        return Err(format!("missing ')' after {} argument", other));
                    }
                    Ok(Expr::Call(func, Box::new(arg)))
                }
            },
            Some(tok) => Err(format!("unexpected {:?}", tok)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, x: f64) -> f64 {
        Expr::parse(src).unwrap().eval(x, 0)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2", 0.0), 512.0);
        assert_eq!(eval("-2 ^ 2", 0.0), -4.0);
        assert_eq!(eval("2 ** 10", 0.0), 1024.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
    }

    #[test]
    fn variables_and_functions() {
        assert_eq!(eval("x / 1000", 2500.0), 2.5);
        assert_eq!(eval("log10(x)", 1000.0), 3.0);
        assert_eq!(eval("round(x * 10) / 10", 1.26), 1.3);
        assert_eq!(Expr::parse("pos * 2").unwrap().eval(0.0, 3), 6.0);
        assert_eq!(eval("1e3 * x", 2.0), 2000.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Expr::parse("x +").is_err());
        assert!(Expr::parse("foo(x)").is_err());
        assert!(Expr::parse("(x").is_err());
        assert!(Expr::parse("x $ 2").is_err());
        assert!(Expr::parse("x 2").is_err());
    }
}
