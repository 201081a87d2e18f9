// thin wrapper for docker cli
//
// Builds the shell lines for the container engine. Whether a line is run fatal or
// best-effort is up to the caller.

pub struct Docker<'a>(&'a str);

fn line(parts: &[&str]) -> String {
  parts
    .iter()
    .filter(|part| !part.is_empty())
    .cloned()
    .collect::<Vec<&str>>()
    .join(" ")
}

impl<'a> Docker<'a> {

  pub fn new(exe: &'a str) -> Self {
    Self(exe)
  }

  pub fn rm_force(&self, container: &str) -> String {
    line(&[self.0, "rm", "-f", container])
  }

  pub fn rmi(&self, image: &str) -> String {
    line(&[self.0, "rmi", image])
  }

  pub fn stop(&self, container: &str) -> String {
    line(&[self.0, "stop", container])
  }

  pub fn run_detached(&self, name: &str, add_hosts: &str, image: &str, timeout: u64) -> String {
    // a scratch container that removes itself once `sleep` runs out

    let name = format!("--name={}", name);
    let timeout = timeout.to_string();
    line(&[self.0, "run", "-d", &name, "--rm=true", add_hosts, image, "sleep", &timeout])
  }

  pub fn exec(&self, container: &str, command: &str) -> String {
    line(&[self.0, "exec", container, command])
  }

  pub fn exec_with(
    &self,
    envs: &[String],
    user: Option<&str>,
    container: &str,
    command: &str,
  ) -> String
  {
    let mut parts = vec![format!("{} exec", self.0)];
    parts.extend(envs.iter().map(|env| format!("-e '{}'", env)));
    if let Some(user) = user {
      parts.push(format!("--user {}", user));
    }
    parts.push(container.to_owned());
    parts.push(command.to_owned());
    parts.retain(|part| !part.is_empty());
    parts.join(" ")
  }

  pub fn commit(&self, changes: &[String], container: &str, image: &str) -> String {
    let mut parts = vec![self.0, "commit"];
    parts.extend(changes.iter().map(String::as_str));
    parts.push(container);
    parts.push(image);
    line(&parts)
  }

  /// `cp <src> <container>:<dst>`. The engine has no `copy` subcommand, `cp` is the one.
  pub fn copy_in(&self, src: &str, container: &str, dst: &str) -> String {
    let target = format!("{}:{}", container, dst);
    line(&[self.0, "cp", src, &target])
  }

  /// `cp <container>:<src> <dst>`, the reverse of `copy_in`.
  pub fn copy_out(&self, container: &str, src: &str, dst: &str) -> String {
    let source = format!("{}:{}", container, src);
    line(&[self.0, "cp", &source, dst])
  }
}

#[cfg(test)]
mod tests {

  use crate::progs::docker::Docker;

  #[test]
  fn test_run_detached() {
    let docker = Docker::new("docker");
    assert_eq!(
      docker.run_detached("build-demo-1", "", "ubuntu:24.04", 999),
      "docker run -d --name=build-demo-1 --rm=true ubuntu:24.04 sleep 999");
    assert_eq!(
      docker.run_detached("build-x", "--add-host=archive.ubuntu.com:172.17.0.2", "ubuntu:24.04", 5),
      "docker run -d --name=build-x --rm=true --add-host=archive.ubuntu.com:172.17.0.2 ubuntu:24.04 sleep 5");
  }

  #[test]
  fn test_exec_with() {
    let docker = Docker::new("podman");
    assert_eq!(docker.exec_with(&[], None, "build-x", "ls"), "podman exec build-x ls");
    let envs = vec!["A=1".to_owned(), "B=2".to_owned()];
    assert_eq!(
      docker.exec_with(&envs, Some("nobody"), "build-x", "bash -c 'id'"),
      "podman exec -e 'A=1' -e 'B=2' --user nobody build-x bash -c 'id'");
  }

  #[test]
  fn test_commit() {
    let docker = Docker::new("docker");
    assert_eq!(docker.commit(&[], "build-x", "x:1"), "docker commit build-x x:1");
    let changes = vec!["-c 'USER nobody'".to_owned()];
    assert_eq!(docker.commit(&changes, "build-x", "x:1"), "docker commit -c 'USER nobody' build-x x:1");
  }

  #[test]
  fn test_copy() {
    let docker = Docker::new("docker");
    assert_eq!(docker.copy_in("a.txt", "build-x", "/tmp/a.txt"), "docker cp a.txt build-x:/tmp/a.txt");
    assert_eq!(docker.copy_out("build-x", "/var/log/dnf.log", "./"), "docker cp build-x:/var/log/dnf.log ./");
  }

  #[test]
  fn test_simple_lines() {
    let docker = Docker::new("docker");
    assert_eq!(docker.rm_force("build-x"), "docker rm -f build-x");
    assert_eq!(docker.rmi("x:1"), "docker rmi x:1");
    assert_eq!(docker.stop("build-x"), "docker stop build-x");
    assert_eq!(docker.exec("build-x", "apt-cache search vim"), "docker exec build-x apt-cache search vim");
  }
}
